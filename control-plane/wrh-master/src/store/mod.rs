use crate::error::VersionResult;
use async_trait::async_trait;
use wrh_models::{ConfigVersion, ShardHost};

mod group;
pub mod memory;
mod snapshot;

pub use memory::MemoryVersionStore;

/// Master-side store of versioned shard-group configurations.
///
/// Every mutating call runs as one exclusive transaction scoped to a single
/// group: the draft-lock check and the state transition are linearizable per
/// group, while different groups never contend.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Add `host` to the group's draft, opening a draft copied forward from
    /// the current published version when none is open.
    async fn add_shard_host(
        &self,
        group: &str,
        host: ShardHost,
    ) -> VersionResult<ConfigVersion>;

    /// Remove `host` from the group's draft, opening a draft the same way as
    /// [`VersionStore::add_shard_host`].
    async fn remove_shard_host(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> VersionResult<ConfigVersion>;

    /// Publish the open draft, making it the group's current version.
    async fn mark_pending_version_ready(
        &self,
        group: &str,
    ) -> VersionResult<ConfigVersion>;

    /// Resolve the open lineage head. A draft is discarded, a published head
    /// is released unchanged.
    async fn delete_pending_version(
        &self,
        group: &str,
    ) -> VersionResult<ConfigVersion>;

    /// The `READY` version with the greatest publish order.
    async fn get_current_version(
        &self,
        group: &str,
    ) -> VersionResult<ConfigVersion>;

    async fn get_pending_version(
        &self,
        group: &str,
    ) -> VersionResult<Option<ConfigVersion>>;

    async fn list_versions(
        &self,
        group: &str,
    ) -> VersionResult<Vec<ConfigVersion>>;
}
