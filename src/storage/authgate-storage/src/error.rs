//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entry already exists (unique or primary key violation).
    #[error("entry already exists: {0}")]
    AlreadyExists(String),

    /// Could not open or reach the database.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A statement failed to execute.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Caller supplied an unusable argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
