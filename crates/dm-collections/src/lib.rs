//! # dm-collections
//!
//! Containers for hydrated query results.
//!
//! ## Structure
//!
//! - `collection` - Ordered, type-homogeneous, lockable `Collection`
//! - `query_result` - Locked `QueryResult` bound to the spec that produced it
//! - `cache` - Injected row cache keyed by table and id
//! - `finder` - Compile, execute, hydrate and wrap in one call

pub mod collection;
pub mod query_result;
pub mod cache;
pub mod finder;

// Re-exports for convenience
pub use collection::Collection;
pub use query_result::QueryResult;
pub use cache::RowCache;
pub use finder::Finder;
