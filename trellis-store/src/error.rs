//! Error types for the graph store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur when talking to the graph store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The path is empty or contains empty segments.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
}
