//! Error types for the peer layer.

use thiserror::Error;
use trellis_store::StoreError;

/// Result type for peer operations.
pub type PeerResult<T> = Result<T, PeerError>;

/// Errors that can occur in peer operations.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Peer ids must be non-empty and must not contain `/`.
    #[error("invalid peer id: {0:?}")]
    InvalidPeerId(String),

    /// Peer not found.
    #[error("peer not found: {0}")]
    PeerNotFound(String),

    /// A stored message could not be decoded.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
