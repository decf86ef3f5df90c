//! Where reconciled values go.

use crate::error::SyncResult;
use async_trait::async_trait;
use serde_json::Value;
use trellis_state::ReplicatedState;

/// A local consumer of reconciled remote values, bound to one path.
#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// The path this target mirrors.
    fn path(&self) -> &str;

    /// Applies a freshly fetched remote value.
    async fn apply(&self, value: &Value) -> SyncResult<()>;
}

#[async_trait]
impl SyncTarget for ReplicatedState {
    fn path(&self) -> &str {
        ReplicatedState::path(self)
    }

    async fn apply(&self, value: &Value) -> SyncResult<()> {
        self.apply_remote(value).await;
        Ok(())
    }
}
