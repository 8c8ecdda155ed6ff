use super::{CapabilityResult, StorageEngine};
use crate::error::CapabilityError;
use async_trait::async_trait;
use scc::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use wrh_models::{HostKey, ShardHost, VersionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityOp {
    CreateRemoteSource,
    CreateSubscription,
    DropSubscription,
    DropRemoteSource,
    InstallView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HostConnection {
    host: ShardHost,
    remote_source: bool,
    subscribed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub group: String,
    pub version_id: VersionId,
    pub hosts: BTreeSet<ShardHost>,
}

type ConnectionKey = (String, HostKey);

/// In-process [`StorageEngine`] that records connections and group views.
///
/// Failures can be injected per operation; each injected failure fires once.
#[derive(Default)]
pub struct MemoryStorageEngine {
    connections: scc::HashMap<ConnectionKey, HostConnection>,
    views: scc::HashMap<String, GroupView>,
    failures: scc::HashMap<CapabilityOp, CapabilityError>,
}

impl MemoryStorageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with `error`.
    pub async fn fail_next(&self, op: CapabilityOp, error: CapabilityError) {
        match self.failures.entry_async(op).await {
            Entry::Occupied(mut o) => *o.get_mut() = error,
            Entry::Vacant(v) => {
                v.insert_entry(error);
            }
        }
    }

    async fn injected(&self, op: CapabilityOp) -> CapabilityResult<()> {
        match self.failures.remove_async(&op).await {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    fn key(group: &str, host: &ShardHost) -> ConnectionKey {
        (group.to_string(), host.key())
    }

    pub async fn is_connected(&self, group: &str, host: &ShardHost) -> bool {
        self.connections
            .read_async(&Self::key(group, host), |_, c| c.subscribed)
            .await
            .unwrap_or(false)
    }

    /// Number of hosts of `group` with an established remote source.
    pub async fn connection_count(&self, group: &str) -> usize {
        let mut count = 0;
        self.connections
            .scan_async(|(g, _), c| {
                if g == group && c.remote_source {
                    count += 1;
                }
            })
            .await;
        count
    }

    /// Resolve the group view a query would run against. Fails when no view
    /// is installed or one of its hosts is no longer connected.
    pub async fn query_group(&self, group: &str) -> CapabilityResult<GroupView> {
        let view = self
            .views
            .read_async(group, |_, v| v.clone())
            .await
            .ok_or_else(|| {
                CapabilityError::retryable(format!(
                    "no connection capability for group `{group}`"
                ))
            })?;
        for host in &view.hosts {
            if !self.is_connected(group, host).await {
                return Err(CapabilityError::retryable(format!(
                    "connection to host {host} of group `{group}` is not established"
                )));
            }
        }
        Ok(view)
    }
}

#[async_trait]
impl StorageEngine for MemoryStorageEngine {
    async fn create_remote_source(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> CapabilityResult<()> {
        self.injected(CapabilityOp::CreateRemoteSource).await?;
        let mut entry = self
            .connections
            .entry_async(Self::key(group, host))
            .await
            .or_insert_with(|| HostConnection {
                host: host.clone(),
                remote_source: false,
                subscribed: false,
            });
        entry.get_mut().remote_source = true;
        debug!(group, host = %host, "remote source created");
        Ok(())
    }

    async fn create_subscription(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> CapabilityResult<()> {
        self.injected(CapabilityOp::CreateSubscription).await?;
        match self.connections.entry_async(Self::key(group, host)).await {
            Entry::Occupied(mut o) if o.get().remote_source => {
                o.get_mut().subscribed = true;
                debug!(group, host = %host, "subscription started");
                Ok(())
            }
            _ => Err(CapabilityError::retryable(format!(
                "no remote source for host {host}"
            ))),
        }
    }

    async fn drop_subscription(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> CapabilityResult<()> {
        self.injected(CapabilityOp::DropSubscription).await?;
        if let Entry::Occupied(mut o) =
            self.connections.entry_async(Self::key(group, host)).await
        {
            o.get_mut().subscribed = false;
        }
        Ok(())
    }

    async fn drop_remote_source(
        &self,
        group: &str,
        host: &ShardHost,
    ) -> CapabilityResult<()> {
        self.injected(CapabilityOp::DropRemoteSource).await?;
        self.connections.remove_async(&Self::key(group, host)).await;
        debug!(group, host = %host, "remote source dropped");
        Ok(())
    }

    async fn established_hosts(
        &self,
        group: &str,
    ) -> CapabilityResult<BTreeMap<ShardHost, bool>> {
        let mut hosts = BTreeMap::new();
        self.connections
            .scan_async(|(g, _), c| {
                if g == group {
                    hosts.insert(c.host.clone(), c.remote_source && c.subscribed);
                }
            })
            .await;
        Ok(hosts)
    }

    async fn install_group_view(
        &self,
        group: &str,
        version_id: VersionId,
        hosts: &BTreeSet<ShardHost>,
    ) -> CapabilityResult<()> {
        self.injected(CapabilityOp::InstallView).await?;
        for host in hosts {
            if !self.is_connected(group, host).await {
                return Err(CapabilityError::retryable(format!(
                    "cannot build view over unconnected host {host}"
                )));
            }
        }
        let view = GroupView {
            group: group.to_string(),
            version_id,
            hosts: hosts.clone(),
        };
        match self.views.entry_async(group.to_string()).await {
            Entry::Occupied(mut o) => *o.get_mut() = view,
            Entry::Vacant(v) => {
                v.insert_entry(view);
            }
        }
        debug!(group, version_id, "group view installed");
        Ok(())
    }

    async fn verify_group_view(
        &self,
        group: &str,
        version_id: VersionId,
        hosts: &BTreeSet<ShardHost>,
    ) -> CapabilityResult<bool> {
        let matches = self
            .views
            .read_async(group, |_, v| {
                v.version_id == version_id && &v.hosts == hosts
            })
            .await
            .unwrap_or(false);
        if !matches {
            return Ok(false);
        }
        for host in hosts {
            if !self.is_connected(group, host).await {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
