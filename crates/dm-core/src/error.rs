//! Core error types for Datamap RS
//!
//! Every failure surfaces to the immediate caller; nothing here is retried
//! or swallowed.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;

/// Standard Result type for Datamap operations
pub type DmResult<T> = Result<T, DmError>;

/// Core error type for all Datamap operations
#[derive(Error, Debug)]
pub enum DmError {
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Collection is locked")]
    Locked,

    #[error("Collection is permanently locked and cannot be unlocked")]
    NotUnlockable,

    #[error("Class mismatch: expected {expected}, found {found}")]
    ClassMismatch {
        expected: String,
        found: &'static str,
    },

    #[error("Unknown field `{field}` on {record_type}")]
    UnknownField {
        record_type: &'static str,
        field: String,
    },

    #[error("Unknown method `{method}` on {record_type}")]
    UnknownMethod {
        record_type: &'static str,
        method: String,
    },

    #[error("Hydration failed: {0}")]
    Hydration(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DmError {
    pub fn error_code(&self) -> &'static str {
        match self {
            DmError::Compile(_) => "compile_error",
            DmError::Locked => "locked",
            DmError::NotUnlockable => "not_unlockable",
            DmError::ClassMismatch { .. } => "class_mismatch",
            DmError::UnknownField { .. } => "unknown_field",
            DmError::UnknownMethod { .. } => "unknown_method",
            DmError::Hydration(_) => "hydration_failed",
            DmError::Storage(_) => "storage_error",
            DmError::Config(_) => "configuration_error",
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, DmError::Locked)
    }
}

/// What went wrong while turning a filter into SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// Entry matched none of the known clause shapes
    UnknownShape,
    /// `[field, operator, operand]` triple whose field or operator is not a string
    MalformedComparison,
    /// Operator string is not one the compiler understands
    UnknownOperator(String),
    /// `:`-prefixed group key other than `:AND` / `:OR`
    UnknownCombinator(String),
    /// LIMIT is not a non-negative integer
    InvalidLimit(String),
    /// OFFSET is not a non-negative integer
    InvalidOffset(String),
    /// `:order` / `:group` value has an unsupported shape
    InvalidOrder(String),
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownShape => write!(f, "unclassifiable clause shape"),
            Self::MalformedComparison => {
                write!(f, "comparison triple needs string field and operator")
            }
            Self::UnknownOperator(op) => write!(f, "unknown operator `{}`", op),
            Self::UnknownCombinator(key) => write!(f, "unknown group combinator `{}`", key),
            Self::InvalidLimit(v) => write!(f, "limit must be a non-negative integer, got `{}`", v),
            Self::InvalidOffset(v) => {
                write!(f, "offset must be a non-negative integer, got `{}`", v)
            }
            Self::InvalidOrder(msg) => write!(f, "invalid ordering: {}", msg),
        }
    }
}

/// Compile-time failure, carrying the offending entry's position in the
/// filter tree (e.g. `/:OR/1/status`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at `{path}`")]
pub struct CompileError {
    pub path: String,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(path: impl Into<String>, kind: CompileErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Failure reported by the persistence collaborator
#[derive(Error, Debug)]
#[error("Storage error: {message}")]
pub struct StorageError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_mentions_path() {
        let err = CompileError::new("/:OR/0", CompileErrorKind::UnknownShape);
        let msg = DmError::from(err).to_string();
        assert!(msg.contains("/:OR/0"));
        assert!(msg.contains("unclassifiable"));
    }

    #[test]
    fn test_storage_error_passthrough() {
        let err = DmError::from(StorageError::new("connection reset"));
        assert_eq!(err.error_code(), "storage_error");
        assert_eq!(err.to_string(), "Storage error: connection reset");
    }
}
