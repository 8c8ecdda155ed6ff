use crate::ShardHost;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display};

pub type VersionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    /// Mutable and invisible to replicas.
    Draft,
    /// Published and immutable.
    Ready,
    /// Abandoned draft. Terminal.
    Discarded,
}

impl Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionStatus::Draft => "DRAFT",
            VersionStatus::Ready => "READY",
            VersionStatus::Discarded => "DISCARDED",
        };
        f.write_str(s)
    }
}

/// A numbered snapshot of the host set of one shard group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigVersion {
    pub id: VersionId,
    pub group: String,
    pub status: VersionStatus,
    /// Position in the group's publish sequence; set once the version
    /// becomes `READY`.
    #[serde(default)]
    pub publish_order: Option<u64>,
    pub hosts: BTreeSet<ShardHost>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl ConfigVersion {
    pub fn new_draft(
        id: VersionId,
        group: impl Into<String>,
        hosts: BTreeSet<ShardHost>,
    ) -> Self {
        Self {
            id,
            group: group.into(),
            status: VersionStatus::Draft,
            publish_order: None,
            hosts,
            created_at: Utc::now(),
            published_at: None,
        }
    }

    #[inline]
    pub fn is_draft(&self) -> bool {
        self.status == VersionStatus::Draft
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.status == VersionStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_in_upper_case() {
        let json = serde_json::to_string(&VersionStatus::Discarded).unwrap();
        assert_eq!(json, "\"DISCARDED\"");
        let back: VersionStatus = serde_json::from_str("\"READY\"").unwrap();
        assert_eq!(back, VersionStatus::Ready);
    }

    #[test]
    fn new_draft_has_no_publish_order() {
        let v = ConfigVersion::new_draft(7, "g1", BTreeSet::new());
        assert!(v.is_draft());
        assert_eq!(v.publish_order, None);
        assert_eq!(v.published_at, None);
    }
}
