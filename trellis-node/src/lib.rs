//! Trellis node: a process that hosts the graph store, the peer directory,
//! the sync engine and the component registry, and reports on them over
//! HTTP.

mod api;
mod config;
mod identity;
mod node;

pub use api::build_router;
pub use config::{default_identity_path, HttpConfig, NodeConfig, WatchedPath};
pub use identity::load_or_generate_identity;
pub use node::{Node, NodeStatus};
