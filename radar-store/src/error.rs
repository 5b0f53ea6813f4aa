//! Ledger configuration and errors

use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file (default: data/radar.db)
    pub path: PathBuf,
    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/radar.db"),
            busy_timeout_ms: 5000,
        }
    }
}

/// Errors from ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Constraint violated: {0}")]
    Conflict(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
                LedgerError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => LedgerError::Sqlite(err),
        }
    }
}

impl LedgerError {
    /// True when the error is a uniqueness or foreign key rejection
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
