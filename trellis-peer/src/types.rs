//! Peer records, transport notifications and stored messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A connected peer as seen by the local process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    /// The peer's id.
    pub id: String,
    /// Where the peer can be reached.
    pub url: String,
    /// When the peer was last heard from. Advisory only.
    pub last_seen: DateTime<Utc>,
}

impl PeerInfo {
    /// Creates a peer record seen now.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            last_seen: Utc::now(),
        }
    }
}

/// A connection change reported by the peer transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerEvent {
    /// A peer connected.
    Connected { id: String, url: String },
    /// A peer went away.
    Disconnected { id: String },
}

/// Change in directory membership, published to directory subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    /// A peer was added (or reconnected with a new URL).
    Joined(PeerInfo),
    /// A peer was removed.
    Left(String),
}

/// A fire-and-forget message exchanged through the graph store.
///
/// Direct messages live at `peers/{id}/inbox`, broadcasts at
/// `peers/broadcast`. Each write replaces the previous message at that
/// node; delivery relies on subscribers observing every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMessage {
    /// Unique message id.
    pub id: Uuid,
    /// Sender's peer id.
    pub from: String,
    /// Recipient peer id, `None` for broadcasts.
    pub to: Option<String>,
    /// Application topic, e.g. `sync.hint`.
    pub topic: String,
    /// Opaque payload, base64 in the stored JSON.
    #[serde(with = "payload_base64")]
    pub payload: Vec<u8>,
    /// When the sender wrote the message.
    pub sent_at: DateTime<Utc>,
}

impl PeerMessage {
    /// Creates a message stamped now.
    pub fn new(
        from: impl Into<String>,
        to: Option<String>,
        topic: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            from: from.into(),
            to,
            topic: topic.into(),
            payload: payload.into(),
            sent_at: Utc::now(),
        }
    }

    /// Whether this is a broadcast.
    pub fn is_broadcast(&self) -> bool {
        self.to.is_none()
    }

    /// The payload as UTF-8, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

mod payload_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
