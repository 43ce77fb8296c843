//! # dm-queries
//!
//! Filter layer for Datamap RS.
//!
//! This crate turns fluent builder chains or nested declarative structures
//! into parameterized SQL.
//!
//! ## Structure
//!
//! - `filters` - Clause tree and comparison operators
//! - `sorts` - Sort orders and directions
//! - `input` - Loosely-shaped declarative filter input
//! - `classifier` - Resolves a raw `(key, value)` entry to a clause shape
//! - `declarative` - Walks declarative input into a `FilterSpec`
//! - `builder` - Fluent API for constructing a `FilterSpec`
//! - `spec` - The `FilterSpec` and its query modifiers
//! - `compiler` - Renders a `FilterSpec` into SQL plus positional bind values
//!
//! ## Example
//!
//! ```
//! use dm_queries::builder::{Conditions, FilterBuilder};
//! use dm_queries::compiler::SqlCompiler;
//! use dm_queries::sorts::SortDirection;
//!
//! let spec = FilterBuilder::new()
//!     .gt("age", 18)
//!     .is_not_null("email")
//!     .order("name", SortDirection::Asc)
//!     .page(2, 25)
//!     .build();
//!
//! let compiled = SqlCompiler::new("users", "id").compile(&spec).unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT * FROM users WHERE age > ? AND email IS NOT NULL ORDER BY name ASC LIMIT 25 OFFSET 25"
//! );
//! ```

pub mod filters;
pub mod sorts;
pub mod input;
pub mod classifier;
pub mod declarative;
pub mod builder;
pub mod spec;
pub mod compiler;

// Re-exports for convenience
pub use filters::{Clause, Combinator, Comparator, FilterOperator, Group, RawExpression};
pub use sorts::{SortCriterion, SortDirection, SortOrder};
pub use input::{FilterInput, FilterKey};
pub use classifier::{classify, ClauseKind};
pub use builder::{Conditions, FilterBuilder, GroupBuilder};
pub use spec::{FilterSpec, Modifiers, Projection};
pub use compiler::{CompiledQuery, SqlCompiler};
