//! Filter Spec
//!
//! A `FilterSpec` is the root clause group plus the query modifiers. It has
//! no mutators: the builder and the declarative parser produce a finished
//! spec, and every "change" (`with_projection`) returns a new one. The
//! compiled SQL is memoized on the instance the first time it is compiled.
//!
//! The memo is not thread-safe, so a spec is `Send` but not `Sync`: it can
//! move to another thread but not be shared between threads. Clone it to
//! hand a copy elsewhere (clones start uncached).

use std::collections::HashSet;
use std::sync::Arc;

use dm_core::{CompileError, Value};
use once_cell::unsync::OnceCell;

use crate::compiler::{CompiledQuery, SqlCompiler};
use crate::filters::{Combinator, Group};
use crate::input::FilterInput;
use crate::sorts::SortOrder;

/// Which columns (or aggregate) the query selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    /// `SELECT *`
    #[default]
    Full,
    /// `SELECT <id column>`
    IdOnly,
    /// `SELECT COUNT(*)`, without ORDER BY / GROUP BY / LIMIT / OFFSET
    CountOnly,
}

/// Query modifiers (everything that is not a WHERE clause)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Modifiers {
    pub order_by: SortOrder,
    pub group_by: Vec<String>,
    /// Validated as a non-negative integer at compile time
    pub limit: Option<Value>,
    /// Validated as a non-negative integer at compile time
    pub offset: Option<Value>,
    pub distinct: bool,
    pub projection: Projection,
    /// Set by `page()`
    pub paged: bool,
    /// Where a declarative `:limit` sat in the input, for error reporting
    pub limit_path: Option<String>,
    pub offset_path: Option<String>,
}

impl Modifiers {
    pub fn limit_value(&self) -> Option<u64> {
        self.limit.as_ref().and_then(Value::as_non_negative)
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset.as_ref().and_then(Value::as_non_negative)
    }

    pub(crate) fn limit_error_path(&self) -> &str {
        self.limit_path.as_deref().unwrap_or("/:limit")
    }

    pub(crate) fn offset_error_path(&self) -> &str {
        self.offset_path.as_deref().unwrap_or("/:limit/offset")
    }

    /// Select one page (1-based, 0 is read as 1) and mark the query as paged
    pub fn set_page(&mut self, page_number: u64, page_size: u64) {
        let page_number = page_number.max(1);
        let offset = page_size.saturating_mul(page_number - 1);
        self.limit = Some(count_value(page_size));
        self.offset = Some(count_value(offset));
        self.limit_path = None;
        self.offset_path = None;
        self.paged = true;
    }
}

pub(crate) fn count_value(n: u64) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Root group plus modifiers, with a per-instance compile memo
pub struct FilterSpec {
    root: Group,
    modifiers: Modifiers,
    compiled: OnceCell<Arc<CompiledQuery>>,
}

impl FilterSpec {
    pub fn new(root: Group, modifiers: Modifiers) -> Self {
        Self {
            root,
            modifiers,
            compiled: OnceCell::new(),
        }
    }

    /// Spec matching every row
    pub fn all() -> Self {
        Self::new(Group::default(), Modifiers::default())
    }

    /// Parse declarative input
    pub fn from_input(input: &FilterInput) -> Result<Self, CompileError> {
        crate::declarative::parse(input)
    }

    /// Parse declarative input, only reading whitelisted keys as scalar entries
    pub fn from_input_with_fields(
        input: &FilterInput,
        known_fields: &HashSet<String>,
    ) -> Result<Self, CompileError> {
        crate::declarative::parse_with_fields(input, known_fields)
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn combinator(&self) -> Combinator {
        self.root.combinator
    }

    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    pub fn projection(&self) -> Projection {
        self.modifiers.projection
    }

    pub fn is_paged(&self) -> bool {
        self.modifiers.paged
    }

    /// Copy of this spec with a different projection (uncompiled)
    pub fn with_projection(&self, projection: Projection) -> Self {
        let mut modifiers = self.modifiers.clone();
        modifiers.projection = projection;
        Self::new(self.root.clone(), modifiers)
    }

    /// Copy of this spec restricted to one page (uncompiled)
    pub fn with_page(&self, page_number: u64, page_size: u64) -> Self {
        let mut modifiers = self.modifiers.clone();
        modifiers.set_page(page_number, page_size);
        Self::new(self.root.clone(), modifiers)
    }

    /// Whether a compiled query has been memoized
    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Shorthand for `SqlCompiler::new(table, id_column).compile(self)`
    pub fn compile(
        &self,
        table: &str,
        id_column: &str,
    ) -> Result<Arc<CompiledQuery>, CompileError> {
        SqlCompiler::new(table, id_column).compile(self)
    }

    pub(crate) fn memo(&self) -> &OnceCell<Arc<CompiledQuery>> {
        &self.compiled
    }
}

impl Clone for FilterSpec {
    fn clone(&self) -> Self {
        Self::new(self.root.clone(), self.modifiers.clone())
    }
}

impl std::fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterSpec")
            .field("root", &self.root)
            .field("modifiers", &self.modifiers)
            .field("compiled", &self.is_compiled())
            .finish()
    }
}
