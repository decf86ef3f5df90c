//! Error types for the component registry.

use thiserror::Error;
use trellis_crypto::CryptoError;
use trellis_store::StoreError;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur publishing, fetching or loading components.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The package signature does not verify against its publisher.
    #[error("signature verification failed for {0}")]
    Signature(String),

    /// The requester is not on the package's access list.
    #[error("access denied to {0}")]
    AccessDenied(String),

    /// Nothing is published at the address.
    #[error("component not found: {0}")]
    NotFound(String),

    /// The access control list is malformed.
    #[error("invalid access control list: {0}")]
    InvalidAcl(String),

    /// The component address is malformed.
    #[error("invalid component address: {0}")]
    InvalidAddress(String),

    /// The component metadata is malformed.
    #[error("invalid component metadata: {0}")]
    InvalidMetadata(String),

    /// The executor refused or failed to run the component.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
