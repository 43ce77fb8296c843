//! Query Result
//!
//! A permanently locked `Collection` that remembers the `FilterSpec` and
//! target it was produced from, so it can answer paging questions and
//! re-issue the same WHERE clause as a count.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use dm_core::{DmError, DmResult, Persistence, Record, Row, StorageError};
use dm_queries::{FilterSpec, Projection, SqlCompiler};
use tracing::debug;

use crate::collection::Collection;

pub struct QueryResult<T> {
    records: Collection<T>,
    spec: FilterSpec,
    compiler: SqlCompiler,
    persistence: Option<Arc<dyn Persistence>>,
}

impl<T: Record> QueryResult<T> {
    /// Wrap hydrated records; the result is locked for good
    pub fn new(
        records: Vec<T>,
        spec: FilterSpec,
        compiler: SqlCompiler,
        persistence: Option<Arc<dyn Persistence>>,
    ) -> DmResult<Self> {
        let mut records = Collection::from_vec(records)?;
        records.lock(true);
        Ok(Self {
            records,
            spec,
            compiler,
            persistence,
        })
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn records(&self) -> &Collection<T> {
        &self.records
    }

    pub fn into_records(self) -> Collection<T> {
        self.records
    }

    pub fn is_paged(&self) -> bool {
        self.spec.is_paged()
    }

    /// 1-based page number, `None` when not paged
    pub fn get_page(&self) -> Option<u64> {
        if !self.is_paged() {
            return None;
        }
        let modifiers = self.spec.modifiers();
        let limit = modifiers.limit_value().unwrap_or(0);
        let offset = modifiers.offset_value().unwrap_or(0);
        Some(if limit == 0 { 1 } else { offset / limit + 1 })
    }

    /// Rows matching the WHERE clause across all pages, `None` when not paged
    pub fn get_total_paged_count(&self) -> DmResult<Option<u64>> {
        if !self.is_paged() {
            return Ok(None);
        }
        let persistence = self.persistence.as_ref().ok_or_else(|| {
            DmError::Storage(StorageError::new("query result has no persistence handle"))
        })?;

        let counting = self.spec.with_projection(Projection::CountOnly);
        let compiled = self.compiler.compile(&counting)?;
        let rows = persistence.execute(&compiled.sql, &compiled.bind)?;
        let total = count_from_rows(&rows)?;
        debug!(table = %self.compiler.table(), total, "Counted paged result");
        Ok(Some(total))
    }

    /// Page size of a paged result
    pub fn get_records_count_on_page(&self) -> Option<u64> {
        self.spec.modifiers().limit_value()
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("records", &self.records)
            .field("spec", &self.spec)
            .field("table", &self.compiler.table())
            .field("has_persistence", &self.persistence.is_some())
            .finish()
    }
}

impl<T> Deref for QueryResult<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl<'a, T> IntoIterator for &'a QueryResult<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        (&self.records).into_iter()
    }
}

/// Read the single value of a `COUNT(...)` result
pub(crate) fn count_from_rows(rows: &[Row]) -> DmResult<u64> {
    let Some(row) = rows.first() else {
        return Ok(0);
    };
    let value = row
        .values()
        .next()
        .ok_or_else(|| DmError::Hydration("count row has no columns".to_string()))?;
    value
        .as_non_negative()
        .ok_or_else(|| DmError::Hydration(format!("count is not a non-negative integer: {}", value)))
}
