use super::group::GroupVersions;
use crate::error::VersionResult;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One JSON document per shard group under a directory. Writes go to a
/// temporary file first and are renamed into place.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotDir {
    dir: PathBuf,
}

impl SnapshotDir {
    pub(crate) async fn open(dir: impl AsRef<Path>) -> VersionResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, group: &str) -> PathBuf {
        self.dir.join(format!("{group}.json"))
    }

    pub(crate) async fn write(&self, state: &GroupVersions) -> VersionResult<()> {
        let path = self.path_for(&state.group);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(group = %state.group, path = %path.display(), "snapshot written");
        Ok(())
    }

    pub(crate) async fn load_all(&self) -> VersionResult<Vec<GroupVersions>> {
        let mut out = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            let state: GroupVersions = serde_json::from_slice(&bytes)?;
            out.push(state);
        }
        Ok(out)
    }
}
