use std::collections::{BTreeMap, BTreeSet};
use wrh_models::ShardHost;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostDiff {
    pub to_remove: Vec<ShardHost>,
    pub to_add: Vec<ShardHost>,
}

impl HostDiff {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

/// Hosts to tear down and to establish so that `established` becomes
/// `target`.
///
/// `established` maps every host with any capability in place to whether it
/// is fully subscribed. Partial hosts outside the target are torn down;
/// partial hosts inside it are established again.
pub fn diff_hosts(
    established: &BTreeMap<ShardHost, bool>,
    target: &BTreeSet<ShardHost>,
) -> HostDiff {
    HostDiff {
        to_remove: established
            .keys()
            .filter(|h| !target.contains(*h))
            .cloned()
            .collect(),
        to_add: target
            .iter()
            .filter(|h| !established.get(*h).copied().unwrap_or(false))
            .cloned()
            .collect(),
    }
}
