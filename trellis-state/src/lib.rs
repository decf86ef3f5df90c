//! Replicated state handles for Trellis.
//!
//! A [`ReplicatedState`] binds a store path to a [`SchemaDefinition`] and
//! keeps a cast, schema-shaped cache of the object at that path:
//!
//! ```text
//! Uninitialized ──new──▶ Initialized ◀──▶ Updated
//!                         (defaults + seed)   (set / update / remote)
//! ```
//!
//! Every cache change is published as a [`StateChange`] on a broadcast
//! channel. Handles never delete their object; callers drop receivers and
//! handles when they are done.
//!
//! [`SchemaDefinition`]: trellis_model::SchemaDefinition

mod error;
mod handle;

pub use error::{StateError, StateResult};
pub use handle::{
    ChangeSource, ReplicatedState, StateChange, WatchGuard, DEFAULT_CHANGE_CAPACITY,
};
