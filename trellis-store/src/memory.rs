//! In-process graph store with a broadcast change feed.

use crate::error::StoreResult;
use crate::path::{is_within, validate_path};
use crate::{GraphStore, StoreSubscription, StoreUpdate, UpdateOrigin};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Default capacity of the change feed.
pub const DEFAULT_FEED_CAPACITY: usize = 1024;

/// A graph store held entirely in memory.
///
/// Every write is published on a single broadcast feed; subscriptions
/// filter it down to their own subtree.
pub struct MemoryGraphStore {
    nodes: RwLock<BTreeMap<String, Value>>,
    feed: broadcast::Sender<StoreUpdate>,
}

impl MemoryGraphStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }

    /// Creates an empty store whose change feed buffers `capacity` updates.
    pub fn with_capacity(capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(capacity.max(1));
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            feed,
        }
    }

    /// Applies a write as if it had been replicated from another peer.
    pub async fn inject_remote(&self, path: &str, value: Value) -> StoreResult<()> {
        self.write(path, value, UpdateOrigin::Remote).await
    }

    /// Number of live nodes.
    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    /// Returns true if no node is live.
    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    async fn write(&self, path: &str, value: Value, origin: UpdateOrigin) -> StoreResult<()> {
        validate_path(path)?;

        let current = {
            let mut nodes = self.nodes.write().await;
            if value.is_null() {
                nodes.remove(path);
                None
            } else {
                let node = match (nodes.remove(path), value) {
                    (Some(Value::Object(mut existing)), Value::Object(incoming)) => {
                        for (field, v) in incoming {
                            existing.insert(field, v);
                        }
                        Value::Object(existing)
                    }
                    (_, incoming) => incoming,
                };
                nodes.insert(path.to_string(), node.clone());
                Some(node)
            }
        };

        debug!("Store write at {} ({:?})", path, origin);
        // No subscribers is not an error.
        let _ = self.feed.send(StoreUpdate {
            path: path.to_string(),
            value: current,
            origin,
        });
        Ok(())
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn put(&self, path: &str, value: Value) -> StoreResult<()> {
        self.write(path, value, UpdateOrigin::Local).await
    }

    async fn get(&self, path: &str) -> StoreResult<Option<Value>> {
        validate_path(path)?;
        Ok(self.nodes.read().await.get(path).cloned())
    }

    fn subscribe(&self, path: &str) -> StoreSubscription {
        StoreSubscription::new(path, self.feed.subscribe())
    }

    async fn scan(&self, prefix: &str) -> StoreResult<Vec<(String, Value)>> {
        validate_path(prefix)?;
        let nodes = self.nodes.read().await;
        Ok(nodes
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .filter(|(path, _)| path.as_str() != prefix && is_within(path, prefix))
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect())
    }
}
