//! Error types for the state table.

use thiserror::Error;

/// Result type alias for state table operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while loading or saving the state table.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open state table: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),
}
