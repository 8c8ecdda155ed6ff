use crate::{ConfigVersion, ShardHost, VersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStep {
    #[default]
    Uninitialized,
    Fetching,
    Diffing,
    ApplyingRemovals,
    ApplyingAdditions,
    Verifying,
    Converged,
    Failed,
}

impl Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStep::Uninitialized => "UNINITIALIZED",
            SyncStep::Fetching => "FETCHING",
            SyncStep::Diffing => "DIFFING",
            SyncStep::ApplyingRemovals => "APPLYING_REMOVALS",
            SyncStep::ApplyingAdditions => "APPLYING_ADDITIONS",
            SyncStep::Verifying => "VERIFYING",
            SyncStep::Converged => "CONVERGED",
            SyncStep::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Durable per-group progress of the convergence state machine on one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSyncState {
    pub group: String,
    pub current_step: SyncStep,
    pub step_description: String,
    /// Version the replica has fully converged to. Only set on `CONVERGED`.
    #[serde(default)]
    pub target_version_id: Option<VersionId>,
    /// Highest published version observed from the master so far.
    #[serde(default)]
    pub latest_known_version_id: Option<VersionId>,
    /// Snapshot being converged to, kept so an interrupted run resumes
    /// without re-fetching.
    #[serde(default)]
    pub fetched: Option<ConfigVersion>,
    /// Host connections that are physically established on this replica.
    #[serde(default)]
    pub installed_host_set: BTreeSet<ShardHost>,
    #[serde(default)]
    pub pending_removals: Vec<ShardHost>,
    #[serde(default)]
    pub pending_additions: Vec<ShardHost>,
    #[serde(default)]
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ReplicaSyncState {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            current_step: SyncStep::Uninitialized,
            step_description: "not started".into(),
            target_version_id: None,
            latest_known_version_id: None,
            fetched: None,
            installed_host_set: BTreeSet::new(),
            pending_removals: Vec::new(),
            pending_additions: Vec::new(),
            last_error: None,
            updated_at: Utc::now(),
        }
    }

    pub fn status(&self) -> GroupSyncStatus {
        GroupSyncStatus {
            group: self.group.clone(),
            step: self.current_step,
            description: self.step_description.clone(),
            target_version_id: self.target_version_id,
            latest_known_version_id: self.latest_known_version_id,
            installed_hosts: self.installed_host_set.len(),
            last_error: self.last_error.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Read-only projection of [`ReplicaSyncState`] exposed to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSyncStatus {
    pub group: String,
    pub step: SyncStep,
    pub description: String,
    pub target_version_id: Option<VersionId>,
    pub latest_known_version_id: Option<VersionId>,
    pub installed_hosts: usize,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Connection parameters a replica uses to reach the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSettings {
    pub master_address: String,
    pub master_port: u16,
    pub identity: String,
    pub credential: String,
    /// Seconds between autonomous sync rounds. Zero disables the timer.
    pub refresh_interval_secs: u64,
}

impl ControllerSettings {
    pub const DEFAULT_REFRESH_SECS: u64 = 10;

    pub fn base_url(&self) -> String {
        if self.master_address.starts_with("http://")
            || self.master_address.starts_with("https://")
        {
            format!("{}:{}", self.master_address, self.master_port)
        } else {
            format!("http://{}:{}", self.master_address, self.master_port)
        }
    }
}
