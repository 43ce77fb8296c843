//! Finder
//!
//! Runs a `FilterSpec` against one table: compile, execute through the
//! persistence collaborator, hydrate, and wrap the records in a
//! `QueryResult`. Errors from any step surface unchanged.

use std::sync::Arc;

use dm_core::config::QueryConfig;
use dm_core::{DmError, DmResult, Hydrator, Persistence, Record, Row, Value};
use dm_queries::{CompiledQuery, Conditions, FilterBuilder, FilterSpec, Projection, SqlCompiler};
use tracing::debug;

use crate::cache::RowCache;
use crate::query_result::{count_from_rows, QueryResult};

pub struct Finder<T> {
    compiler: SqlCompiler,
    persistence: Arc<dyn Persistence>,
    hydrator: Box<dyn Hydrator<T>>,
    cache: Option<Arc<RowCache>>,
    config: QueryConfig,
}

impl<T: Record> Finder<T> {
    /// Finder for `table`, keyed by the configured default id column
    pub fn new(
        table: impl Into<String>,
        persistence: Arc<dyn Persistence>,
        hydrator: impl Hydrator<T> + 'static,
        config: QueryConfig,
    ) -> Self {
        Self {
            compiler: SqlCompiler::new(table, config.default_id_column.clone()),
            persistence,
            hydrator: Box::new(hydrator),
            cache: None,
            config,
        }
    }

    pub fn with_id_column(mut self, id_column: impl Into<String>) -> Self {
        self.compiler = SqlCompiler::new(self.compiler.table(), id_column);
        self
    }

    /// Share a row cache; only consulted when `cache_rows` is enabled
    pub fn with_cache(mut self, cache: Arc<RowCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn compiler(&self) -> &SqlCompiler {
        &self.compiler
    }

    /// Fetch and hydrate every row the spec matches
    pub fn find(&self, spec: FilterSpec) -> DmResult<QueryResult<T>> {
        let compiled = self.compiler.compile(&spec)?;
        let rows = self.run(&compiled)?;
        if spec.projection() == Projection::Full {
            self.remember(&rows);
        }

        let records = rows
            .iter()
            .map(|row| self.hydrator.hydrate(row))
            .collect::<DmResult<Vec<_>>>()?;
        QueryResult::new(
            records,
            spec,
            self.compiler.clone(),
            Some(Arc::clone(&self.persistence)),
        )
    }

    /// Fetch one page; `page_size` defaults to and is capped by the configuration
    pub fn find_page(
        &self,
        spec: &FilterSpec,
        page_number: u64,
        page_size: Option<u64>,
    ) -> DmResult<QueryResult<T>> {
        let size = self
            .config
            .clamp_page_size(page_size.unwrap_or(self.config.default_page_size));
        self.find(spec.with_page(page_number, size))
    }

    /// Ids of the matching rows, in result order
    pub fn find_ids(&self, spec: &FilterSpec) -> DmResult<Vec<Value>> {
        let compiled = self
            .compiler
            .compile(&spec.with_projection(Projection::IdOnly))?;
        self.run(&compiled)?
            .iter()
            .map(|row| self.id_of(row))
            .collect()
    }

    /// Number of rows matching the spec's WHERE clause
    pub fn count(&self, spec: &FilterSpec) -> DmResult<u64> {
        let compiled = self
            .compiler
            .compile(&spec.with_projection(Projection::CountOnly))?;
        count_from_rows(&self.run(&compiled)?)
    }

    /// Load one record by id, answering from the row cache when possible
    pub fn get(&self, id: impl Into<Value>) -> DmResult<Option<T>> {
        let id = id.into();
        if let Some(row) = self.cached_row(&id) {
            return self.hydrator.hydrate(&row).map(Some);
        }

        let spec = FilterBuilder::new()
            .eq(self.compiler.id_column(), id)
            .limit(1, None)
            .build();
        let compiled = self.compiler.compile(&spec)?;
        let rows = self.run(&compiled)?;
        self.remember(&rows);
        rows.first().map(|row| self.hydrator.hydrate(row)).transpose()
    }

    fn run(&self, compiled: &CompiledQuery) -> DmResult<Vec<Row>> {
        let rows = self.persistence.execute(&compiled.sql, &compiled.bind)?;
        debug!(
            table = %compiled.table,
            sql = %compiled.sql,
            rows = rows.len(),
            "Executed query"
        );
        Ok(rows)
    }

    fn id_of(&self, row: &Row) -> DmResult<Value> {
        row.get(self.compiler.id_column()).cloned().ok_or_else(|| {
            DmError::Hydration(format!(
                "row from {} has no `{}` column",
                self.compiler.table(),
                self.compiler.id_column()
            ))
        })
    }

    fn active_cache(&self) -> Option<&RowCache> {
        self.cache
            .as_deref()
            .filter(|_| self.config.cache_rows)
    }

    fn cached_row(&self, id: &Value) -> Option<Row> {
        self.active_cache()?.get(self.compiler.table(), id)
    }

    fn remember(&self, rows: &[Row]) {
        let Some(cache) = self.active_cache() else {
            return;
        };
        for row in rows {
            if let Ok(id) = self.id_of(row) {
                cache.insert(self.compiler.table(), &id, row.clone());
            }
        }
    }
}
