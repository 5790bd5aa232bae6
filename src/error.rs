//! Error types for the result cache.

use std::io;
use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for result cache operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (PK-mapping file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No update table could be bound to the cache.
    #[error("No update table bound; the result is not updatable")]
    NoUpdateTable,

    /// A DML flush requires a primary key that is not fully present.
    #[error("Primary key for table {table} is incomplete (missing: {})", columns.join(", "))]
    MissingPrimaryKeys { table: String, columns: Vec<String> },

    /// A row arrived with the wrong number of values.
    #[error("Column count mismatch: expected {expected}, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// A DML statement failed during flush.
    #[error("Statement failed: {message} (sql: {sql})")]
    Execution { sql: String, message: String },

    /// The transaction commit at the end of a flush failed.
    #[error("Commit failed: {message}")]
    CommitFailed { message: String },

    /// Population aborted because the configured memory budget was exceeded.
    #[error("Low memory: result exceeds budget of {limit} bytes (used: {used})")]
    LowMemory { limit: usize, used: usize },

    /// A line in the PK-mapping file could not be parsed.
    #[error("Invalid PK mapping entry: {line}")]
    InvalidPkMapping { line: String },
}

impl Error {
    /// Create a per-statement execution error.
    pub fn execution(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Create a commit failure error.
    pub fn commit_failed(message: impl Into<String>) -> Self {
        Self::CommitFailed {
            message: message.into(),
        }
    }
}
