use super::{ReplicaStateStore, StoreResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use wrh_models::{ControllerSettings, ReplicaSyncState};

#[derive(Default)]
pub struct MemoryReplicaStateStore {
    settings: RwLock<Option<ControllerSettings>>,
    states: RwLock<BTreeMap<String, ReplicaSyncState>>,
}

impl MemoryReplicaStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReplicaStateStore for MemoryReplicaStateStore {
    async fn save_controller_settings(
        &self,
        settings: &ControllerSettings,
    ) -> StoreResult<()> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }

    async fn load_controller_settings(
        &self,
    ) -> StoreResult<Option<ControllerSettings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_sync_state(&self, state: &ReplicaSyncState) -> StoreResult<()> {
        let mut states = self.states.write().await;
        states.insert(state.group.clone(), state.clone());
        Ok(())
    }

    async fn load_sync_state(
        &self,
        group: &str,
    ) -> StoreResult<Option<ReplicaSyncState>> {
        Ok(self.states.read().await.get(group).cloned())
    }

    async fn list_sync_states(&self) -> StoreResult<Vec<ReplicaSyncState>> {
        Ok(self.states.read().await.values().cloned().collect())
    }
}
