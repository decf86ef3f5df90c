//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// A public key string or its bytes could not be decoded.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Key agreement produced no usable secret.
    #[error("key agreement failed: {0}")]
    KeyAgreement(String),

    /// Signature did not verify against the payload and key.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// A signature string could not be decoded.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
