use crate::error::CapabilityError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use wrh_models::{ShardHost, VersionId};

pub mod memory;

pub use memory::{CapabilityOp, GroupView, MemoryStorageEngine};

pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// The local storage engine that physically connects a replica to the other
/// shard hosts of a group.
///
/// Implementations must make every operation idempotent: the convergence
/// engine retries a step after a partial failure and may repeat calls that
/// already succeeded.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Create the remote data-source endpoint for `host`.
    async fn create_remote_source(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> CapabilityResult<()>;

    /// Start the data subscription from `host`. Requires the remote source.
    async fn create_subscription(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> CapabilityResult<()>;

    async fn drop_subscription(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> CapabilityResult<()>;

    async fn drop_remote_source(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> CapabilityResult<()>;

    /// Swap the group's queryable view to cover exactly `hosts`.
    async fn install_group_view(
        &self,
        group: &str,
        version_id: VersionId,
        hosts: &BTreeSet<ShardHost>,
    ) -> CapabilityResult<()>;

    /// Hosts of `group` with any capability in place, mapped to whether
    /// their subscription is running. Half-built or half-torn hosts map to
    /// `false`.
    async fn established_hosts(
        &self,
        group: &str,
    ) -> CapabilityResult<BTreeMap<ShardHost, bool>>;

    /// Whether the installed view matches `version_id` and `hosts` and every
    /// host in it is still subscribed.
    async fn verify_group_view(
        &self,
        group: &str,
        version_id: VersionId,
        hosts: &BTreeSet<ShardHost>,
    ) -> CapabilityResult<bool>;
}
