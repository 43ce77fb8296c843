//! Filter Clauses
//!
//! Every filter, whether built fluently or parsed from declarative input,
//! ends up as a tree of `Clause` nodes. Nothing past the classifier ever
//! looks at raw maps or arrays.

use dm_core::Value;

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// Equals (=)
    Eq,
    /// Not equals (!=)
    NotEq,
    /// Less than (<)
    Lt,
    /// Greater than (>)
    Gt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than or equal (>=)
    GtEq,
}

impl Comparator {
    /// Parse operator from its SQL spelling
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "=" | "==" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::LtEq),
            ">=" => Some(Self::GtEq),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
        }
    }
}

/// Operators accepted in declarative `[operator, operand]` entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Compare(Comparator),
    In,
    NotIn,
    Like,
    NotLike,
    /// `IS` with a null operand
    Is,
    /// `IS NOT` with a null operand
    IsNot,
}

impl FilterOperator {
    /// Parse operator string (case-insensitive, whitespace-tolerant)
    pub fn from_str(s: &str) -> Option<Self> {
        if let Some(cmp) = Comparator::from_str(s) {
            return Some(Self::Compare(cmp));
        }

        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        match normalized.as_str() {
            "IN" => Some(Self::In),
            "NOT IN" => Some(Self::NotIn),
            "LIKE" => Some(Self::Like),
            "NOT LIKE" => Some(Self::NotLike),
            "IS" => Some(Self::Is),
            "IS NOT" => Some(Self::IsNot),
            _ => None,
        }
    }
}

/// How a group joins its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    /// Parse a `:AND` / `:OR` group key
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_uppercase().as_str() {
            ":AND" => Some(Self::And),
            ":OR" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn joiner(&self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// A verbatim SQL fragment with its own positional bind values
#[derive(Debug, Clone, PartialEq)]
pub struct RawExpression {
    pub sql: String,
    pub bind: Vec<Value>,
}

impl RawExpression {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            bind: vec![],
        }
    }

    pub fn with_bind(sql: impl Into<String>, bind: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            bind,
        }
    }
}

/// Boolean combination of child clauses
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub combinator: Combinator,
    pub children: Vec<Clause>,
}

impl Group {
    pub fn new(combinator: Combinator, children: Vec<Clause>) -> Self {
        Self {
            combinator,
            children,
        }
    }

    pub fn and(children: Vec<Clause>) -> Self {
        Self::new(Combinator::And, children)
    }

    pub fn or(children: Vec<Clause>) -> Self {
        Self::new(Combinator::Or, children)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nested (non-root) groups below this one
    pub fn nested_group_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Clause::Group(group) => 1 + group.nested_group_count(),
                _ => 0,
            })
            .sum()
    }
}

/// One node of the filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `field <op> ?`
    Comparison {
        field: String,
        op: Comparator,
        value: Value,
    },
    /// `field [NOT] IN (?, ...)`
    Membership {
        field: String,
        negate: bool,
        values: Vec<Value>,
    },
    /// `field IS [NOT] NULL`
    NullCheck { field: String, is_null: bool },
    /// `field [NOT] LIKE ?`
    Pattern {
        field: String,
        negate: bool,
        pattern: Value,
    },
    /// Verbatim fragment
    Raw(RawExpression),
    /// Parenthesized sub-group
    Group(Group),
}

impl Clause {
    pub fn comparison(field: impl Into<String>, op: Comparator, value: impl Into<Value>) -> Self {
        Self::Comparison {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn membership(field: impl Into<String>, negate: bool, values: Vec<Value>) -> Self {
        Self::Membership {
            field: field.into(),
            negate,
            values,
        }
    }

    pub fn null_check(field: impl Into<String>, is_null: bool) -> Self {
        Self::NullCheck {
            field: field.into(),
            is_null,
        }
    }

    pub fn pattern(field: impl Into<String>, negate: bool, pattern: impl Into<Value>) -> Self {
        Self::Pattern {
            field: field.into(),
            negate,
            pattern: pattern.into(),
        }
    }

    /// Bind values this clause (and its subtree) contributes
    pub fn bind_count(&self) -> usize {
        match self {
            Self::Comparison { .. } | Self::Pattern { .. } => 1,
            Self::Membership { values, .. } => values.len(),
            Self::NullCheck { .. } => 0,
            Self::Raw(expr) => expr.bind.len(),
            Self::Group(group) => group.children.iter().map(Clause::bind_count).sum(),
        }
    }
}
