//! Filter Builder
//!
//! Fluent API for constructing a `FilterSpec`. Clause methods live on the
//! `Conditions` trait so that nested groups (`and_group` / `or_group`) get
//! the same vocabulary as the top level; modifiers only exist on
//! `FilterBuilder`.

use dm_core::Value;

use crate::filters::{Clause, Combinator, Comparator, Group, RawExpression};
use crate::sorts::{SortCriterion, SortDirection};
use crate::spec::{count_value, FilterSpec, Modifiers, Projection};

/// Clause-appending vocabulary shared by the top-level and group builders
pub trait Conditions: Sized {
    /// Append one clause to the current group
    fn push_clause(self, clause: Clause) -> Self;

    /// Append `field <op> ?`
    fn add_comparison(
        self,
        field: impl Into<String>,
        op: Comparator,
        value: impl Into<Value>,
    ) -> Self {
        self.push_clause(Clause::comparison(field, op, value))
    }

    fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_comparison(field, Comparator::Eq, value)
    }

    fn neq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_comparison(field, Comparator::NotEq, value)
    }

    fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_comparison(field, Comparator::Gt, value)
    }

    fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_comparison(field, Comparator::Lt, value)
    }

    fn gteq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_comparison(field, Comparator::GtEq, value)
    }

    fn lteq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_comparison(field, Comparator::LtEq, value)
    }

    fn is_null(self, field: impl Into<String>) -> Self {
        self.push_clause(Clause::null_check(field, true))
    }

    fn is_not_null(self, field: impl Into<String>) -> Self {
        self.push_clause(Clause::null_check(field, false))
    }

    /// `field IN (...)`
    fn is_in<I>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_clause(Clause::membership(field, false, values))
    }

    /// `field NOT IN (...)`
    fn not_in<I>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push_clause(Clause::membership(field, true, values))
    }

    /// `field LIKE ?`; wildcards are the caller's business
    fn like(self, field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        self.push_clause(Clause::pattern(field, false, pattern))
    }

    fn not_like(self, field: impl Into<String>, pattern: impl Into<Value>) -> Self {
        self.push_clause(Clause::pattern(field, true, pattern))
    }

    /// Verbatim SQL fragment with its own bind values
    fn expression(self, sql: impl Into<String>, bind: Vec<Value>) -> Self {
        self.push_clause(Clause::Raw(RawExpression::with_bind(sql, bind)))
    }

    /// Parenthesized AND group
    fn and_group(self, build: impl FnOnce(GroupBuilder) -> GroupBuilder) -> Self {
        let group = build(GroupBuilder::new(Combinator::And)).into_group();
        self.push_clause(Clause::Group(group))
    }

    /// Parenthesized OR group
    fn or_group(self, build: impl FnOnce(GroupBuilder) -> GroupBuilder) -> Self {
        let group = build(GroupBuilder::new(Combinator::Or)).into_group();
        self.push_clause(Clause::Group(group))
    }
}

/// Builder for one nested group
#[derive(Debug)]
pub struct GroupBuilder {
    group: Group,
}

impl GroupBuilder {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            group: Group::new(combinator, vec![]),
        }
    }

    pub fn into_group(self) -> Group {
        self.group
    }
}

impl Conditions for GroupBuilder {
    fn push_clause(mut self, clause: Clause) -> Self {
        self.group.children.push(clause);
        self
    }
}

/// Builder for constructing a `FilterSpec` fluently
#[derive(Debug, Default)]
pub struct FilterBuilder {
    root: Group,
    modifiers: Modifiers,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join top-level clauses with OR instead of AND
    pub fn or_query(mut self, or: bool) -> Self {
        self.root.combinator = if or { Combinator::Or } else { Combinator::And };
        self
    }

    // Modifier methods

    /// Append an ORDER BY entry
    pub fn order(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.modifiers
            .order_by
            .add(SortCriterion::new(field, direction));
        self
    }

    pub fn order_asc(self, field: impl Into<String>) -> Self {
        self.order(field, SortDirection::Asc)
    }

    pub fn order_desc(self, field: impl Into<String>) -> Self {
        self.order(field, SortDirection::Desc)
    }

    /// Append a GROUP BY column
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.modifiers.group_by.push(field.into());
        self
    }

    /// Set LIMIT and, optionally, OFFSET
    pub fn limit(mut self, limit: u64, offset: Option<u64>) -> Self {
        self.modifiers.limit = Some(count_value(limit));
        self.modifiers.offset = offset.map(count_value);
        self
    }

    /// Select one page (1-based) of `page_size` rows and mark the spec as paged
    pub fn page(mut self, page_number: u64, page_size: u64) -> Self {
        self.modifiers.set_page(page_number, page_size);
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.modifiers.distinct = distinct;
        self
    }

    /// Select only the id column (or go back to full rows)
    pub fn set_id_only(mut self, id_only: bool) -> Self {
        self.modifiers.projection = if id_only {
            Projection::IdOnly
        } else {
            Projection::Full
        };
        self
    }

    pub fn count_only(mut self) -> Self {
        self.modifiers.projection = Projection::CountOnly;
        self
    }

    /// Build the spec
    pub fn build(self) -> FilterSpec {
        FilterSpec::new(self.root, self.modifiers)
    }
}

impl Conditions for FilterBuilder {
    fn push_clause(mut self, clause: Clause) -> Self {
        self.root.children.push(clause);
        self
    }
}
