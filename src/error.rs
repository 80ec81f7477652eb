//! Unified error hierarchy for edgescore
//!
//! The modeling pipeline itself never fails: missing inputs degrade to
//! `None` fields. Errors come from the storage collaborator, from input
//! validation at ingestion time, and from configuration handling.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all edgescore operations
#[derive(Debug, Error)]
pub enum EdgeError {
    /// Persistence layer errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Input rejected before reaching the pipeline
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding of cached results
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage collaborator errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Database file could not be opened
    #[error("Cannot open database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// Stored value could not be decoded
    #[error("Corrupt value in {table}.{column}: {reason}")]
    Corrupt {
        table: String,
        column: String,
        reason: String,
    },
}

/// Result type alias for edgescore operations
pub type Result<T> = std::result::Result<T, EdgeError>;

impl EdgeError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EdgeError::Validation(_) => ErrorSeverity::Warning,
            EdgeError::Store(StoreError::Corrupt { .. }) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            EdgeError::Store(StoreError::OpenFailed { path, .. }) => {
                format!(
                    "Unable to open the sleep database at {}. Check the database_path setting.",
                    path.display()
                )
            }
            EdgeError::Store(StoreError::Corrupt { table, .. }) => format!(
                "Stored {} could not be read back. The database may need to be rebuilt.",
                table.replace('_', " ")
            ),
            EdgeError::Validation(reason) => format!("Entry rejected: {}", reason),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Data integrity problem
    Critical,
    /// Operation failed
    Error,
    /// Operation refused, nothing is broken
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
