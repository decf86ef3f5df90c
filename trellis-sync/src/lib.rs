//! Synchronization engine for Trellis.
//!
//! The engine keeps replicated state handles consistent with the graph
//! store under priority and backpressure:
//!
//! - each watched path has a [`SyncStatus`] counting unreconciled remote
//!   updates
//! - updates queue their path in a [`SyncQueue`] (`High > Normal > Low`,
//!   FIFO within a priority, one entry per path)
//! - a single drain loop fetches each queued path, applies the value to
//!   the bound [`SyncTarget`] and retries failures a bounded number of
//!   times
//!
//! Everything observable is published as a [`SyncEvent`].

mod config;
mod engine;
mod error;
mod queue;
mod status;
mod target;

pub use config::SyncConfig;
pub use engine::{SyncEngine, HINT_TOPIC};
pub use error::{SyncError, SyncResult};
pub use queue::{Priority, SyncQueue, SyncQueueEntry};
pub use status::{SyncEvent, SyncStatus};
pub use target::SyncTarget;
