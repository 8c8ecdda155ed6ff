use crate::error::{VersionError, VersionResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use wrh_models::{ConfigVersion, ShardHost, VersionId, VersionStatus};

/// Store-wide monotonic version id allocator.
#[derive(Debug)]
pub(crate) struct IdSequence(AtomicU64);

impl IdSequence {
    pub(crate) fn starting_at(first: VersionId) -> Self {
        Self(AtomicU64::new(first.max(1)))
    }

    pub(crate) fn next(&self) -> VersionId {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// All versions of one shard group plus the two pointers that drive the
/// draft lock: `head` is the open lineage (a draft, or a published version
/// not yet resolved by the operator) and `current` is the published version
/// with the greatest publish order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct GroupVersions {
    pub(crate) group: String,
    pub(crate) versions: BTreeMap<VersionId, ConfigVersion>,
    pub(crate) head: Option<VersionId>,
    pub(crate) current: Option<VersionId>,
    pub(crate) publish_seq: u64,
}

impl GroupVersions {
    pub(crate) fn new(group: &str) -> Self {
        Self {
            group: group.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn current(&self) -> Option<&ConfigVersion> {
        self.current.and_then(|id| self.versions.get(&id))
    }

    pub(crate) fn head(&self) -> Option<&ConfigVersion> {
        self.head.and_then(|id| self.versions.get(&id))
    }

    pub(crate) fn max_version_id(&self) -> VersionId {
        self.versions.keys().next_back().copied().unwrap_or(0)
    }

    fn locked(&self) -> VersionError {
        VersionError::VersionLocked(self.group.clone())
    }

    fn open_draft(&mut self, ids: &IdSequence) -> VersionResult<VersionId> {
        if let Some(head) = self.head() {
            return match head.status {
                VersionStatus::Draft => Ok(head.id),
                VersionStatus::Ready | VersionStatus::Discarded => {
                    Err(self.locked())
                }
            };
        }
        let hosts = self
            .current()
            .map(|v| v.hosts.clone())
            .unwrap_or_default();
        let id = ids.next();
        self.versions
            .insert(id, ConfigVersion::new_draft(id, &self.group, hosts));
        self.head = Some(id);
        Ok(id)
    }

    fn draft_mut(&mut self, id: VersionId) -> VersionResult<&mut ConfigVersion> {
        let group = self.group.clone();
        self.versions
            .get_mut(&id)
            .filter(|v| v.is_draft())
            .ok_or(VersionError::NoDraftExists(group))
    }

    pub(crate) fn add_host(
        &mut self,
        host: ShardHost,
        ids: &IdSequence,
    ) -> VersionResult<ConfigVersion> {
        let id = self.open_draft(ids)?;
        let draft = self.draft_mut(id)?;
        draft.hosts.insert(host);
        Ok(draft.clone())
    }

    pub(crate) fn remove_host(
        &mut self,
        host: &ShardHost,
        ids: &IdSequence,
    ) -> VersionResult<ConfigVersion> {
        // Check against the set the draft would start from so a miss does
        // not leave a fresh draft behind.
        let base = match self.head() {
            Some(head) if head.is_draft() => Some(&head.hosts),
            Some(_) => return Err(self.locked()),
            None => self.current().map(|v| &v.hosts),
        };
        if !base.is_some_and(|hosts| hosts.contains(host)) {
            return Err(VersionError::NotFound(format!(
                "host {host} in group `{}`",
                self.group
            )));
        }
        let id = self.open_draft(ids)?;
        let draft = self.draft_mut(id)?;
        draft.hosts.remove(host);
        Ok(draft.clone())
    }

    pub(crate) fn publish(&mut self) -> VersionResult<ConfigVersion> {
        let id = match self.head() {
            Some(head) if head.is_draft() => head.id,
            _ => return Err(VersionError::NoDraftExists(self.group.clone())),
        };
        self.publish_seq += 1;
        let order = self.publish_seq;
        let draft = self.draft_mut(id)?;
        draft.status = VersionStatus::Ready;
        draft.publish_order = Some(order);
        draft.published_at = Some(Utc::now());
        let published = draft.clone();
        self.current = Some(id);
        Ok(published)
    }

    pub(crate) fn discard(&mut self) -> VersionResult<ConfigVersion> {
        let id = self
            .head
            .ok_or_else(|| VersionError::NoDraftExists(self.group.clone()))?;
        let version = self
            .versions
            .get_mut(&id)
            .ok_or_else(|| VersionError::NoDraftExists(self.group.clone()))?;
        if version.is_draft() {
            version.status = VersionStatus::Discarded;
        }
        let resolved = version.clone();
        self.head = None;
        Ok(resolved)
    }
}
