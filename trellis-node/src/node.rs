//! A running node: one store, one peer directory, one sync engine and one
//! registry, wired together.

use crate::config::NodeConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trellis_crypto::Identity;
use trellis_peer::{Messenger, PeerDirectory, PeerEvent, PeerInfo, TopologyReport};
use trellis_registry::Registry;
use trellis_store::MemoryGraphStore;
use trellis_sync::{SyncEngine, SyncEvent};

/// Snapshot served by `GET /api/v1/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub peer_id: String,
    pub public_key: String,
    pub watched_paths: Vec<String>,
    pub pending_changes: u64,
    pub peers: Vec<PeerInfo>,
    pub topology: TopologyReport,
}

/// The node's services.
pub struct Node {
    identity: Identity,
    store: Arc<MemoryGraphStore>,
    directory: Arc<PeerDirectory>,
    sync: SyncEngine,
    registry: Arc<Registry>,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    /// Builds every service and starts syncing the configured paths.
    pub async fn start(config: NodeConfig, identity: Identity) -> Result<Self> {
        let store = Arc::new(MemoryGraphStore::new());
        let directory = Arc::new(
            PeerDirectory::new(store.clone(), config.peer.clone())
                .context("Invalid peer configuration")?,
        );
        let messenger: Arc<dyn Messenger> = directory.clone();

        let sync = SyncEngine::with_messenger(store.clone(), config.sync.clone(), messenger.clone());
        let mut tasks = vec![log_sync_events(sync.subscribe())];
        sync.listen_for_peer_hints(&directory).await?;

        let registry = Arc::new(
            Registry::with_messenger(store.clone(), config.registry.clone(), messenger)
                .await
                .context("Failed to open component registry")?,
        );
        tasks.push(registry.watch_public());

        for watched in &config.watch {
            sync.start_sync(&watched.path, watched.priority)
                .await
                .with_context(|| format!("Failed to watch {}", watched.path))?;
        }

        info!(
            "Node {} started ({} watched paths)",
            directory.local_id(),
            config.watch.len()
        );
        Ok(Self {
            identity,
            store,
            directory,
            sync,
            registry,
            tasks,
        })
    }

    /// This node's signing identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The node's graph store.
    pub fn store(&self) -> &Arc<MemoryGraphStore> {
        &self.store
    }

    /// The peer directory.
    pub fn directory(&self) -> &Arc<PeerDirectory> {
        &self.directory
    }

    /// The sync engine.
    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    /// The component registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Feeds a transport notification to the directory.
    pub async fn handle_peer_event(&self, event: PeerEvent) {
        self.directory.handle_event(event).await;
    }

    /// Current status.
    pub async fn status(&self) -> NodeStatus {
        NodeStatus {
            peer_id: self.directory.local_id().to_string(),
            public_key: self.identity.public().to_string(),
            watched_paths: self.sync.watched_paths().await,
            pending_changes: self.sync.pending_changes_count().await,
            peers: self.directory.peers().await,
            topology: self.directory.analyze_topology().await,
        }
    }

    /// Stops syncing and background tasks.
    pub async fn shutdown(&self) {
        self.sync.stop().await;
        for task in &self.tasks {
            task.abort();
        }
        info!("Node {} stopped", self.directory.local_id());
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn log_sync_events(mut events: broadcast::Receiver<SyncEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_sync_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Sync event log lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_sync_event(event: &SyncEvent) {
    match event {
        SyncEvent::Started { path, priority } => {
            info!("Sync started: {} ({})", path, priority);
        }
        SyncEvent::Stopped { path } => info!("Sync stopped: {}", path),
        SyncEvent::Paused { path } => info!("Sync paused: {}", path),
        SyncEvent::Resumed { path } => info!("Sync resumed: {}", path),
        SyncEvent::RemoteUpdate {
            path,
            pending_changes,
        } => {
            debug!("Remote update: {} ({} pending)", path, pending_changes);
        }
        SyncEvent::Reconciled { path, at } => debug!("Reconciled {} at {}", path, at),
        SyncEvent::AttemptFailed {
            path,
            attempt,
            error,
        } => {
            warn!("Sync attempt {} for {} failed: {}", attempt, path, error);
        }
        SyncEvent::RetryExhausted {
            path,
            attempts,
            error,
        } => {
            warn!("Giving up on {} after {} attempts: {}", path, attempts, error);
        }
    }
}
