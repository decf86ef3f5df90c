//! Messaging abstraction.
//!
//! Consumers (the sync engine, the component registry) only need to send
//! and broadcast opaque payloads; they depend on this trait rather than on
//! a concrete directory.

use crate::error::PeerResult;
use async_trait::async_trait;

/// Fire-and-forget messaging to peers.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// This process's peer id.
    fn local_id(&self) -> &str;

    /// Sends `payload` on `topic` to one peer.
    async fn send(&self, peer_id: &str, topic: &str, payload: &[u8]) -> PeerResult<()>;

    /// Sends `payload` on `topic` to every peer.
    async fn broadcast(&self, topic: &str, payload: &[u8]) -> PeerResult<()>;
}

/// A recording messenger for testing.
pub mod mock {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    /// One recorded outgoing message.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentMessage {
        /// Recipient, `None` for broadcasts.
        pub to: Option<String>,
        /// Topic.
        pub topic: String,
        /// Payload bytes.
        pub payload: Vec<u8>,
    }

    /// Records every message instead of delivering it.
    #[derive(Debug)]
    pub struct RecordingMessenger {
        local_id: String,
        sent: Mutex<Vec<SentMessage>>,
    }

    impl RecordingMessenger {
        /// Creates a messenger for `local_id`.
        pub fn new(local_id: impl Into<String>) -> Self {
            Self {
                local_id: local_id.into(),
                sent: Mutex::new(Vec::new()),
            }
        }

        /// Everything sent so far, in order.
        pub fn sent(&self) -> Vec<SentMessage> {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        /// Messages sent on `topic`.
        pub fn sent_on(&self, topic: &str) -> Vec<SentMessage> {
            self.sent()
                .into_iter()
                .filter(|m| m.topic == topic)
                .collect()
        }

        fn record(&self, to: Option<&str>, topic: &str, payload: &[u8]) {
            self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(SentMessage {
                to: to.map(str::to_string),
                topic: topic.to_string(),
                payload: payload.to_vec(),
            });
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        fn local_id(&self) -> &str {
            &self.local_id
        }

        async fn send(&self, peer_id: &str, topic: &str, payload: &[u8]) -> PeerResult<()> {
            self.record(Some(peer_id), topic, payload);
            Ok(())
        }

        async fn broadcast(&self, topic: &str, payload: &[u8]) -> PeerResult<()> {
            self.record(None, topic, payload);
            Ok(())
        }
    }
}
