use crate::error::ReplicaError;
use async_trait::async_trait;
use wrh_models::{ControllerSettings, ReplicaSyncState};

pub mod file;
pub mod memory;

pub use file::FileReplicaStateStore;
pub use memory::MemoryReplicaStateStore;

pub type StoreResult<T> = Result<T, ReplicaError>;

/// Replica-local durable state: controller settings and one
/// [`ReplicaSyncState`] per shard group.
#[async_trait]
pub trait ReplicaStateStore: Send + Sync {
    async fn save_controller_settings(
        &self,
        settings: &ControllerSettings,
    ) -> StoreResult<()>;
    async fn load_controller_settings(
        &self,
    ) -> StoreResult<Option<ControllerSettings>>;
    async fn save_sync_state(&self, state: &ReplicaSyncState) -> StoreResult<()>;
    async fn load_sync_state(
        &self,
        group: &str,
    ) -> StoreResult<Option<ReplicaSyncState>>;
    async fn list_sync_states(&self) -> StoreResult<Vec<ReplicaSyncState>>;
}
