//! Row cache
//!
//! Unbounded store of raw rows keyed by `(table, id)`. Nothing evicts
//! entries; the owner decides how long the cache lives and hands it to
//! each `Finder` that should share it.

use std::collections::HashMap;

use dm_core::{Row, Value};
use parking_lot::Mutex;
use tracing::trace;

#[derive(Debug, Default)]
pub struct RowCache {
    rows: Mutex<HashMap<(String, String), Row>>,
}

impl RowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str, id: &Value) -> Option<Row> {
        let row = self.rows.lock().get(&key(table, id)).cloned();
        if row.is_some() {
            trace!(table = %table, id = %id, "Row cache hit");
        }
        row
    }

    /// Store `row`, replacing any previous entry for the same id
    pub fn insert(&self, table: &str, id: &Value, row: Row) {
        self.rows.lock().insert(key(table, id), row);
    }

    pub fn contains(&self, table: &str, id: &Value) -> bool {
        self.rows.lock().contains_key(&key(table, id))
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    pub fn clear(&self) {
        self.rows.lock().clear();
    }
}

// Ids compare by their display form, so Int(5) and "5" share an entry
fn key(table: &str, id: &Value) -> (String, String) {
    (table.to_string(), id.to_string())
}
