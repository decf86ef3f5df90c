//! Error types for the sync engine.

use thiserror::Error;
use trellis_peer::PeerError;
use trellis_store::StoreError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The path is already being synchronized.
    #[error("already watching {0}")]
    AlreadyWatching(String),

    /// The path is not being synchronized.
    #[error("not watching {0}")]
    NotWatching(String),

    /// A state handle is already bound to the path.
    #[error("a state handle is already registered for {0}")]
    AlreadyRegistered(String),

    /// Every reconciliation attempt failed.
    #[error("gave up on {path} after {attempts} attempts")]
    RetryExhausted { path: String, attempts: u32 },

    /// Reading the remote value failed.
    #[error("fetch of {path} failed: {source}")]
    Fetch {
        path: String,
        #[source]
        source: StoreError,
    },

    /// The bound state handle rejected the fetched value.
    #[error("applying {path} failed: {reason}")]
    Apply { path: String, reason: String },

    /// Reading the remote value took longer than the fetch timeout.
    #[error("fetch of {path} timed out after {after_ms}ms")]
    Timeout { path: String, after_ms: u64 },

    /// The engine has been stopped.
    #[error("sync engine stopped")]
    Stopped,

    /// Invalid store path.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Peer messaging failed.
    #[error("peer error: {0}")]
    Peer(#[from] PeerError),
}
