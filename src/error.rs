//! Error types for sqlplay
//!
//! This module defines all error types used by the table store, the control
//! commands and the script interpreter.

use std::path::PathBuf;
use thiserror::Error;

use crate::script::FaultKind;

/// The main error type for sqlplay
#[derive(Error, Debug)]
pub enum Error {
    // ========== Table Store Errors ==========
    #[error("Invalid table name '{0}': must be an identifier that is not a reserved word")]
    InvalidName(String),

    #[error("Table '{0}' already exists")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Corrupt artifact {path}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("Unsupported format for {path}: expected a '.{expected}' file")]
    UnsupportedFormat {
        path: PathBuf,
        expected: &'static str,
    },

    #[error("Column '{column}' has {found} value(s), table has {expected} row(s)")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    // ========== Command Errors ==========
    #[error("Unknown command '{0}' (try /help)")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    // ========== Engine Errors ==========
    #[error("Sync error ({target}): {source}")]
    Sync {
        target: String,
        #[source]
        source: Box<Error>,
    },

    #[error("SQL error: {0}")]
    Engine(#[from] rusqlite::Error),

    // ========== Script Errors ==========
    #[error("Script error: {kind}: {message}\n  at {trace}")]
    Script {
        kind: FaultKind,
        message: String,
        trace: String,
    },

    // ========== Persistence Errors ==========
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wrap an engine failure that happened while syncing `table`
    pub fn sync(table: &str, source: Error) -> Self {
        Error::Sync {
            target: format!("table '{}'", table),
            source: Box::new(source),
        }
    }

    /// Wrap an engine failure that happened while reading the catalog
    pub fn catalog(source: Error) -> Self {
        Error::Sync {
            target: "catalog".to_string(),
            source: Box::new(source),
        }
    }
}

/// Result type alias for sqlplay operations
pub type Result<T> = std::result::Result<T, Error>;
