use super::group::{GroupVersions, IdSequence};
use super::snapshot::SnapshotDir;
use super::VersionStore;
use crate::error::{VersionError, VersionResult};
use async_trait::async_trait;
use scc::hash_map::Entry;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::info;
use validator::Validate;
use wrh_models::{ConfigVersion, ShardHost, validate_group_name};

type GroupSlot = Arc<RwLock<GroupVersions>>;

/// In-process [`VersionStore`] with one reader/writer lock per group.
///
/// Mutations run on a copy of the group state and replace it only after the
/// optional snapshot write succeeded, so a failed transaction leaves nothing
/// behind, not even the slot of a group it would have created. Readers hold the same lock in shared mode and therefore observe
/// a publish either entirely or not at all.
pub struct MemoryVersionStore {
    groups: scc::HashMap<String, GroupSlot>,
    ids: IdSequence,
    snapshots: Option<SnapshotDir>,
}

impl Default for MemoryVersionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self {
            groups: scc::HashMap::new(),
            ids: IdSequence::starting_at(1),
            snapshots: None,
        }
    }

    /// Open a store persisted under `dir`, loading every group found there.
    pub async fn with_snapshot_dir(
        dir: impl AsRef<Path>,
    ) -> VersionResult<Self> {
        let snapshots = SnapshotDir::open(dir).await?;
        let loaded = snapshots.load_all().await?;
        let next_id = loaded
            .iter()
            .map(GroupVersions::max_version_id)
            .max()
            .unwrap_or(0)
            + 1;
        let groups = scc::HashMap::new();
        for state in loaded {
            info!(
                group = %state.group,
                versions = state.versions.len(),
                "loaded group snapshot"
            );
            let key = state.group.clone();
            let _ = groups.insert_async(key, Arc::new(RwLock::new(state))).await;
        }
        Ok(Self {
            groups,
            ids: IdSequence::starting_at(next_id),
            snapshots: Some(snapshots),
        })
    }

    /// Write-lock the slot of `group`, creating it when absent. The flag is
    /// set when the slot was created by this call and is not committed yet.
    async fn lock_slot(
        &self,
        group: &str,
    ) -> (OwnedRwLockWriteGuard<GroupVersions>, bool) {
        loop {
            if let Some(slot) = self.groups.read_async(group, |_, s| s.clone()).await {
                let guard = slot.clone().write_owned().await;
                let live = self
                    .groups
                    .read_async(group, |_, s| Arc::ptr_eq(s, &slot))
                    .await
                    .unwrap_or(false);
                if live {
                    return (guard, false);
                }
                // retired by a failed first transaction
                continue;
            }
            let slot: GroupSlot = Arc::new(RwLock::new(GroupVersions::new(group)));
            let guard = slot.clone().write_owned().await;
            match self.groups.entry_async(group.to_string()).await {
                Entry::Vacant(vacant) => {
                    vacant.insert_entry(slot);
                    return (guard, true);
                }
                Entry::Occupied(_) => continue,
            }
        }
    }

    async fn existing_slot(&self, group: &str) -> VersionResult<GroupSlot> {
        validate_group_name(group)?;
        self.groups
            .read_async(group, |_, slot| slot.clone())
            .await
            .ok_or_else(|| VersionError::NotFound(format!("group `{group}`")))
    }

    async fn transact<R>(
        &self,
        group: &str,
        op: impl FnOnce(&mut GroupVersions, &IdSequence) -> VersionResult<R>,
    ) -> VersionResult<R> {
        validate_group_name(group)?;
        let (mut guard, created) = self.lock_slot(group).await;
        let mut next = guard.clone();
        let result = match op(&mut next, &self.ids) {
            Ok(out) => match &self.snapshots {
                Some(snapshots) => snapshots.write(&next).await.map(|_| out),
                None => Ok(out),
            },
            Err(e) => Err(e),
        };
        match result {
            Ok(out) => {
                *guard = next;
                Ok(out)
            }
            Err(e) => {
                if created {
                    // removed while locked; waiting writers re-check the map
                    let _ = self.groups.remove_async(group).await;
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn add_shard_host(
        &self,
        group: &str,
        host: ShardHost,
    ) -> VersionResult<ConfigVersion> {
        host.validate()?;
        let label = host.to_string();
        let draft = self
            .transact(group, move |g, ids| g.add_host(host, ids))
            .await?;
        info!(group, host = %label, version = draft.id, "shard host added to draft");
        Ok(draft)
    }

    async fn remove_shard_host(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> VersionResult<ConfigVersion> {
        let draft = self
            .transact(group, |g, ids| g.remove_host(host, ids))
            .await?;
        info!(group, host = %host, version = draft.id, "shard host removed from draft");
        Ok(draft)
    }

    async fn mark_pending_version_ready(
        &self,
        group: &str,
    ) -> VersionResult<ConfigVersion> {
        let published = self.transact(group, |g, _| g.publish()).await?;
        info!(
            group,
            version = published.id,
            hosts = published.hosts.len(),
            "pending version published"
        );
        Ok(published)
    }

    async fn delete_pending_version(
        &self,
        group: &str,
    ) -> VersionResult<ConfigVersion> {
        let resolved = self.transact(group, |g, _| g.discard()).await?;
        info!(
            group,
            version = resolved.id,
            status = %resolved.status,
            "pending version resolved"
        );
        Ok(resolved)
    }

    async fn get_current_version(
        &self,
        group: &str,
    ) -> VersionResult<ConfigVersion> {
        let slot = self.existing_slot(group).await?;
        let state = slot.read().await;
        state.current().cloned().ok_or_else(|| {
            VersionError::NotFound(format!(
                "published version of group `{group}`"
            ))
        })
    }

    async fn get_pending_version(
        &self,
        group: &str,
    ) -> VersionResult<Option<ConfigVersion>> {
        let slot = match self.existing_slot(group).await {
            Ok(slot) => slot,
            Err(VersionError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let state = slot.read().await;
        Ok(state.head().cloned())
    }

    async fn list_versions(
        &self,
        group: &str,
    ) -> VersionResult<Vec<ConfigVersion>> {
        let slot = match self.existing_slot(group).await {
            Ok(slot) => slot,
            Err(VersionError::NotFound(_)) => return Ok(vec![]),
            Err(e) => return Err(e),
        };
        let state = slot.read().await;
        Ok(state.versions.values().cloned().collect())
    }
}
