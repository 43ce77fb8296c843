//! Configuration types and loading

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatamapConfig {
    /// Query compilation and paging defaults
    pub query: QueryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Primary key column used for id-only projections
    pub default_id_column: String,
    /// Page size used when a caller does not pick one
    pub default_page_size: u64,
    /// Upper bound applied to requested page sizes
    pub max_page_size: u64,
    /// Keep fetched rows in the injected row cache
    pub cache_rows: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_id_column: "id".to_string(),
            default_page_size: 20,
            max_page_size: 1000,
            cache_rows: false,
        }
    }
}

impl QueryConfig {
    /// Clamp a requested page size into `1..=max_page_size`
    pub fn clamp_page_size(&self, size: u64) -> u64 {
        size.clamp(1, self.max_page_size.max(1))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directive used when `RUST_LOG` is unset
    pub default_directive: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl DatamapConfig {
    /// Load configuration from the environment (and `.env`, if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let parse_bool = |v: String| v == "true" || v == "1" || v == "yes";

        // Query
        if let Some(column) = lookup("DATAMAP_ID_COLUMN") {
            config.query.default_id_column = column;
        }
        if let Some(size) = lookup("DATAMAP_PAGE_SIZE") {
            config.query.default_page_size = parse_u64("DATAMAP_PAGE_SIZE", &size)?;
        }
        if let Some(size) = lookup("DATAMAP_MAX_PAGE_SIZE") {
            config.query.max_page_size = parse_u64("DATAMAP_MAX_PAGE_SIZE", &size)?;
        }
        if let Some(v) = lookup("DATAMAP_CACHE_ROWS") {
            config.query.cache_rows = parse_bool(v);
        }

        // Logging
        if let Some(directive) = lookup("DATAMAP_LOG") {
            config.logging.default_directive = directive;
        }
        if let Some(v) = lookup("DATAMAP_LOG_JSON") {
            config.logging.json = parse_bool(v);
        }

        Ok(config)
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{}", e),
    })
}
