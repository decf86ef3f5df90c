//! Replicated graph store contract for Trellis.
//!
//! The graph database itself is an external collaborator: it owns
//! replication, conflict resolution and delivery. This crate only pins down
//! the surface the rest of the toolkit relies on:
//!
//! - `put(path, value)` merges an object into the node at `path`
//! - `get(path)` reads the current node, if any
//! - `subscribe(path)` observes every change to `path` or its descendants
//! - `scan(prefix)` enumerates live nodes below a prefix
//!
//! Delivery is at-least-once with no ordering guarantee across paths.
//!
//! [`MemoryGraphStore`] is an in-process implementation used by tests, the
//! node binary and embedders that do not need real replication.

mod error;
mod memory;
pub mod mock;
mod path;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryGraphStore;
pub use path::{is_within, join, validate_path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

/// Where an observed change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOrigin {
    /// Written through this process.
    Local,
    /// Replicated in from another peer.
    Remote,
}

/// A change notification from the store's change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreUpdate {
    /// The node that changed.
    pub path: String,
    /// The node's value after the change (`None` once tombstoned).
    pub value: Option<Value>,
    /// Whether the change was local or replicated.
    pub origin: UpdateOrigin,
}

/// The replicated graph store as seen by Trellis.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Writes `value` at `path`.
    ///
    /// Object values merge field-by-field into an existing object node;
    /// any other value replaces the node. `null` tombstones the node.
    async fn put(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Reads the node at `path`. Tombstoned or never-written nodes are `None`.
    async fn get(&self, path: &str) -> StoreResult<Option<Value>>;

    /// Observes changes to `path` and every path below it.
    /// Dropping the subscription deregisters it.
    fn subscribe(&self, path: &str) -> StoreSubscription;

    /// Lists every live node strictly below `prefix`, ordered by path.
    async fn scan(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>>;
}

/// A filtered view of a store's change feed.
pub struct StoreSubscription {
    path: String,
    receiver: broadcast::Receiver<StoreUpdate>,
}

impl StoreSubscription {
    /// Wraps a raw change-feed receiver, keeping only updates within `path`.
    pub fn new(path: impl Into<String>, receiver: broadcast::Receiver<StoreUpdate>) -> Self {
        Self {
            path: path.into(),
            receiver,
        }
    }

    /// The path this subscription watches.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Waits for the next change within the watched path.
    /// Returns `None` once the store has shut down.
    pub async fn recv(&mut self) -> Option<StoreUpdate> {
        loop {
            match self.receiver.recv().await {
                Ok(update) if is_within(&update.path, &self.path) => return Some(update),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscription on {} lagged, skipped {} updates", self.path, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl std::fmt::Debug for StoreSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSubscription")
            .field("path", &self.path)
            .finish()
    }
}
