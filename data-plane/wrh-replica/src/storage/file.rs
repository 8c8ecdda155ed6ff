use super::{ReplicaStateStore, StoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::info;
use wrh_models::{ControllerSettings, ReplicaSyncState};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    controller: Option<ControllerSettings>,
    #[serde(default)]
    groups: BTreeMap<String, ReplicaSyncState>,
}

/// JSON-file backed [`ReplicaStateStore`]. The whole document is rewritten
/// through a temporary file on every save, and the in-memory copy is only
/// updated once the rename succeeded.
pub struct FileReplicaStateStore {
    path: PathBuf,
    doc: Mutex<StateDocument>,
}

impl FileReplicaStateStore {
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                StateDocument::default()
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        info!(path = %path.display(), groups = doc.groups.len(), "opened replica state");
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    async fn persist(&self, doc: &StateDocument) -> StoreResult<()> {
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(doc)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ReplicaStateStore for FileReplicaStateStore {
    async fn save_controller_settings(
        &self,
        settings: &ControllerSettings,
    ) -> StoreResult<()> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        next.controller = Some(settings.clone());
        self.persist(&next).await?;
        *doc = next;
        Ok(())
    }

    async fn load_controller_settings(
        &self,
    ) -> StoreResult<Option<ControllerSettings>> {
        Ok(self.doc.lock().await.controller.clone())
    }

    async fn save_sync_state(&self, state: &ReplicaSyncState) -> StoreResult<()> {
        let mut doc = self.doc.lock().await;
        let mut next = doc.clone();
        next.groups.insert(state.group.clone(), state.clone());
        self.persist(&next).await?;
        *doc = next;
        Ok(())
    }

    async fn load_sync_state(
        &self,
        group: &str,
    ) -> StoreResult<Option<ReplicaSyncState>> {
        Ok(self.doc.lock().await.groups.get(group).cloned())
    }

    async fn list_sync_states(&self) -> StoreResult<Vec<ReplicaSyncState>> {
        Ok(self.doc.lock().await.groups.values().cloned().collect())
    }
}
