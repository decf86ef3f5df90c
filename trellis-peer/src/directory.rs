//! The peer directory and its store-backed message channels.

use crate::config::PeerConfig;
use crate::error::{PeerError, PeerResult};
use crate::messenger::Messenger;
use crate::topology::TopologyReport;
use crate::types::{DirectoryEvent, PeerEvent, PeerInfo, PeerMessage};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trellis_store::{GraphStore, StoreSubscription};

/// Store node that holds broadcast messages.
pub const BROADCAST_PATH: &str = "peers/broadcast";

/// Store node that holds direct messages for `peer_id`.
pub fn inbox_path(peer_id: &str) -> String {
    format!("peers/{peer_id}/inbox")
}

fn validate_peer_id(id: &str) -> PeerResult<()> {
    if id.is_empty() || id.contains('/') {
        return Err(PeerError::InvalidPeerId(id.to_string()));
    }
    Ok(())
}

/// Tracks connected peers and exchanges messages with them through the
/// graph store.
pub struct PeerDirectory {
    config: PeerConfig,
    store: Arc<dyn GraphStore>,
    peers: RwLock<HashMap<String, PeerInfo>>,
    events: broadcast::Sender<DirectoryEvent>,
}

impl PeerDirectory {
    /// Creates an empty directory for the local peer described by `config`.
    pub fn new(store: Arc<dyn GraphStore>, config: PeerConfig) -> PeerResult<Self> {
        validate_peer_id(&config.local_id)?;
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Ok(Self {
            config,
            store,
            peers: RwLock::new(HashMap::new()),
            events,
        })
    }

    /// This process's peer id.
    pub fn local_id(&self) -> &str {
        &self.config.local_id
    }

    /// This process's advertised URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Subscribes to membership changes.
    pub fn subscribe(&self) -> broadcast::Receiver<DirectoryEvent> {
        self.events.subscribe()
    }

    // ── Membership ───────────────────────────────────────────────

    /// Applies a transport notification.
    pub async fn handle_event(&self, event: PeerEvent) {
        match event {
            PeerEvent::Connected { id, url } => {
                if id == self.config.local_id {
                    debug!("Ignoring connect notification for local peer");
                    return;
                }
                if validate_peer_id(&id).is_err() {
                    warn!("Ignoring connect notification with invalid peer id {:?}", id);
                    return;
                }
                let info = PeerInfo::new(id.clone(), url);
                self.peers.write().await.insert(id.clone(), info.clone());
                info!("Peer connected: {} at {}", id, info.url);
                let _ = self.events.send(DirectoryEvent::Joined(info));
            }
            PeerEvent::Disconnected { id } => {
                if self.remove(&id).await.is_none() {
                    debug!("Disconnect for unknown peer {}", id);
                }
            }
        }
    }

    /// Removes a peer on the local side.
    pub async fn disconnect(&self, id: &str) -> PeerResult<PeerInfo> {
        self.remove(id)
            .await
            .ok_or_else(|| PeerError::PeerNotFound(id.to_string()))
    }

    async fn remove(&self, id: &str) -> Option<PeerInfo> {
        let removed = self.peers.write().await.remove(id);
        if removed.is_some() {
            info!("Peer disconnected: {}", id);
            let _ = self.events.send(DirectoryEvent::Left(id.to_string()));
        }
        removed
    }

    /// Connected peers, sorted by id.
    pub async fn peers(&self) -> Vec<PeerInfo> {
        let mut peers: Vec<PeerInfo> = self.peers.read().await.values().cloned().collect();
        peers.sort_by(|a, b| a.id.cmp(&b.id));
        peers
    }

    /// Looks up one peer.
    pub async fn peer(&self, id: &str) -> Option<PeerInfo> {
        self.peers.read().await.get(id).cloned()
    }

    /// Number of connected peers.
    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Returns true if no peer is connected.
    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Marks a peer as seen now. Returns false for unknown peers.
    pub async fn touch(&self, id: &str) -> bool {
        match self.peers.write().await.get_mut(id) {
            Some(peer) => {
                peer.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Applies transport notifications from `receiver` until it closes.
    pub fn listen(self: &Arc<Self>, mut receiver: mpsc::Receiver<PeerEvent>) -> JoinHandle<()> {
        let directory = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                directory.handle_event(event).await;
            }
            debug!("Peer event channel closed");
        })
    }

    // ── Messaging ────────────────────────────────────────────────

    /// Writes a direct message to `peer_id`'s inbox.
    ///
    /// Fire-and-forget: the peer does not need to be connected and no
    /// acknowledgement is tracked.
    pub async fn send_to_peer(&self, peer_id: &str, topic: &str, payload: &[u8]) -> PeerResult<()> {
        validate_peer_id(peer_id)?;
        let message = PeerMessage::new(
            self.config.local_id.clone(),
            Some(peer_id.to_string()),
            topic,
            payload,
        );
        debug!("Sending {} to {} ({} bytes)", topic, peer_id, payload.len());
        self.store
            .put(&inbox_path(peer_id), serde_json::to_value(&message)?)
            .await?;
        Ok(())
    }

    /// Writes a message every peer's inbox stream picks up.
    pub async fn broadcast(&self, topic: &str, payload: &[u8]) -> PeerResult<()> {
        let message = PeerMessage::new(self.config.local_id.clone(), None, topic, payload);
        debug!("Broadcasting {} ({} bytes)", topic, payload.len());
        self.store
            .put(BROADCAST_PATH, serde_json::to_value(&message)?)
            .await?;
        Ok(())
    }

    /// Streams messages addressed to this peer or broadcast by others.
    pub fn inbox(&self) -> PeerInbox {
        PeerInbox {
            local_id: self.config.local_id.clone(),
            inbox_path: inbox_path(&self.config.local_id),
            subscription: self.store.subscribe("peers"),
        }
    }

    // ── Topology ─────────────────────────────────────────────────

    /// Topology of the known peers, assuming every peer is connected to
    /// every other.
    pub async fn analyze_topology(&self) -> TopologyReport {
        TopologyReport::full_mesh(self.len().await)
    }

    /// Topology from explicit link data over the known peers.
    pub async fn analyze_topology_with(&self, links: &[(String, String)]) -> TopologyReport {
        let peers = self.peers.read().await;
        TopologyReport::from_links(peers.keys().map(String::as_str), links)
    }
}

#[async_trait]
impl Messenger for PeerDirectory {
    fn local_id(&self) -> &str {
        &self.config.local_id
    }

    async fn send(&self, peer_id: &str, topic: &str, payload: &[u8]) -> PeerResult<()> {
        self.send_to_peer(peer_id, topic, payload).await
    }

    async fn broadcast(&self, topic: &str, payload: &[u8]) -> PeerResult<()> {
        PeerDirectory::broadcast(self, topic, payload).await
    }
}

/// A stream of incoming peer messages.
#[derive(Debug)]
pub struct PeerInbox {
    local_id: String,
    inbox_path: String,
    subscription: StoreSubscription,
}

impl PeerInbox {
    /// Waits for the next message from another peer.
    ///
    /// Skips the local peer's own broadcasts and anything that does not
    /// decode as a message. Returns `None` once the store shuts down.
    pub async fn recv(&mut self) -> Option<PeerMessage> {
        loop {
            let update = self.subscription.recv().await?;
            if update.path != self.inbox_path && update.path != BROADCAST_PATH {
                continue;
            }
            let Some(value) = update.value else { continue };
            match serde_json::from_value::<PeerMessage>(value) {
                Ok(message) if message.from == self.local_id => continue,
                Ok(message) => return Some(message),
                Err(e) => {
                    warn!("Dropping malformed message at {}: {}", update.path, e);
                    continue;
                }
            }
        }
    }
}
