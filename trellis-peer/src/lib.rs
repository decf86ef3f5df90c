//! Peer directory and messaging facade for Trellis.
//!
//! The peer transport (WebRTC or otherwise) is an external collaborator. It
//! reports connections as [`PeerEvent`]s; this crate keeps the resulting
//! directory and carries small fire-and-forget messages through the graph
//! store:
//!
//! - direct messages: `peers/{id}/inbox`
//! - broadcasts: `peers/broadcast`
//!
//! There is no acknowledgement tracking and no exactly-once delivery.

mod config;
mod directory;
mod error;
pub mod messenger;
mod topology;
mod types;

pub use config::PeerConfig;
pub use directory::{inbox_path, PeerDirectory, PeerInbox, BROADCAST_PATH};
pub use error::{PeerError, PeerResult};
pub use messenger::Messenger;
pub use topology::TopologyReport;
pub use types::{DirectoryEvent, PeerEvent, PeerInfo, PeerMessage};
