//! Peer directory configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Configuration for a [`PeerDirectory`](crate::PeerDirectory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// This process's peer id.
    pub local_id: String,
    /// URL other peers reach this process at.
    pub url: String,
    /// Capacity of the directory event channel.
    pub event_capacity: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            local_id: Uuid::now_v7().to_string(),
            url: String::new(),
            event_capacity: 256,
        }
    }
}

impl PeerConfig {
    /// Default configuration with the given local id.
    pub fn with_local_id(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            ..Self::default()
        }
    }
}
