//! Error types for replicated state handles.

use thiserror::Error;
use trellis_model::ValidationError;
use trellis_store::StoreError;

/// Result type for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur reading or writing replicated state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The graph store rejected the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A value did not have the shape the schema requires.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The local version moved since the caller read it.
    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    /// The cached value could not be converted to the requested type.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
