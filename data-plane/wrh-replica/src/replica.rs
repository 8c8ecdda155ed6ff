use crate::capability::StorageEngine;
use crate::client::{HttpControllerClient, VersionSource};
use crate::engine::ConvergenceEngine;
use crate::error::ReplicaError;
use crate::readiness::is_ready;
use crate::storage::ReplicaStateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wrh_models::{
    ControllerSettings, GroupSyncStatus, ReplicaSyncState, validate_group_name,
};

/// Replica-side entry point: owns the controller connection, the local state
/// store and the convergence engine.
pub struct Replica {
    store: Arc<dyn ReplicaStateStore>,
    engine: ConvergenceEngine,
    settings: RwLock<Option<ControllerSettings>>,
    source: RwLock<Option<Arc<dyn VersionSource>>>,
    request_timeout: Duration,
    group_locks: scc::HashMap<String, Arc<Mutex<()>>>,
}

impl Replica {
    /// Open a replica over `store`, reconnecting to the master if controller
    /// settings were persisted by an earlier run.
    pub async fn open(
        store: Arc<dyn ReplicaStateStore>,
        storage: Arc<dyn StorageEngine>,
        request_timeout: Duration,
    ) -> Result<Self, ReplicaError> {
        let settings = store.load_controller_settings().await?;
        let source = match &settings {
            Some(s) => {
                info!("restoring controller settings for {}", s.base_url());
                let client = HttpControllerClient::new(s, request_timeout)?;
                Some(Arc::new(client) as Arc<dyn VersionSource>)
            }
            None => None,
        };
        Ok(Self {
            store,
            engine: ConvergenceEngine::new(storage),
            settings: RwLock::new(settings),
            source: RwLock::new(source),
            request_timeout,
            group_locks: scc::HashMap::new(),
        })
    }

    /// Persist the master connection parameters. Does not contact the master.
    pub async fn configure_controller(
        &self,
        settings: ControllerSettings,
    ) -> Result<(), ReplicaError> {
        let client = HttpControllerClient::new(&settings, self.request_timeout)?;
        self.store.save_controller_settings(&settings).await?;
        info!(
            master = %client.base_url(),
            identity = %settings.identity,
            refresh_secs = settings.refresh_interval_secs,
            "controller configured"
        );
        *self.source.write().await = Some(Arc::new(client));
        *self.settings.write().await = Some(settings);
        Ok(())
    }

    /// Replace the version source without touching persisted settings.
    pub async fn set_version_source(&self, source: Arc<dyn VersionSource>) {
        *self.source.write().await = Some(source);
    }

    pub async fn settings(&self) -> Option<ControllerSettings> {
        self.settings.read().await.clone()
    }

    async fn group_lock(&self, group: &str) -> Arc<Mutex<()>> {
        self.group_locks
            .entry_async(group.to_string())
            .await
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .get()
            .clone()
    }

    /// Advance `group` by one convergence step and return its description.
    pub async fn sync_step(&self, group: &str) -> Result<String, ReplicaError> {
        validate_group_name(group)?;
        let source = self
            .source
            .read()
            .await
            .clone()
            .ok_or(ReplicaError::NotConfigured)?;

        let lock = self.group_lock(group).await;
        let _guard = lock.lock().await;
        let state = self
            .store
            .load_sync_state(group)
            .await?
            .unwrap_or_else(|| ReplicaSyncState::new(group));
        let next = self.engine.advance(state, source.as_ref()).await;
        self.store.save_sync_state(&next).await?;
        Ok(next.step_description)
    }

    /// One step for each of `groups`. Failures are logged and reported per group.
    pub async fn sync_all(
        &self,
        groups: &[String],
    ) -> Vec<(String, Result<String, ReplicaError>)> {
        let mut results = Vec::with_capacity(groups.len());
        for group in groups {
            let result = self.sync_step(group).await;
            if let Err(e) = &result {
                warn!(group = %group, "sync step failed: {}", e);
            }
            results.push((group.clone(), result));
        }
        results
    }

    /// Local readiness of `group`. Unknown groups and unreadable state are
    /// reported as not ready.
    pub async fn replica_ready(&self, group: &str) -> bool {
        match self.store.load_sync_state(group).await {
            Ok(Some(state)) => is_ready(&state),
            Ok(None) => false,
            Err(e) => {
                warn!(group = %group, "cannot read sync state: {}", e);
                false
            }
        }
    }

    /// Step `group` until it is ready or `max_steps` steps have run. Every
    /// readiness check follows a step, so a publish since the last step is
    /// seen before the group reports ready.
    pub async fn poll_ready(
        &self,
        group: &str,
        max_steps: usize,
    ) -> Result<bool, ReplicaError> {
        for _ in 0..max_steps {
            let description = self.sync_step(group).await?;
            debug!(group = %group, "{}", description);
            if self.replica_ready(group).await {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn status(&self) -> Result<Vec<GroupSyncStatus>, ReplicaError> {
        let states = self.store.list_sync_states().await?;
        Ok(states.iter().map(ReplicaSyncState::status).collect())
    }

    /// Drive [`Replica::sync_all`] on a timer. Returns `None` when no
    /// controller is configured or the refresh interval is zero.
    pub async fn spawn_refresh_loop(
        self: Arc<Self>,
        groups: Vec<String>,
        token: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let secs = self.settings().await?.refresh_interval_secs;
        if secs == 0 || groups.is_empty() {
            info!("autonomous refresh disabled");
            return None;
        }
        info!(?groups, "starting refresh loop every {}s", secs);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sync_all(&groups).await;
                    }
                    _ = token.cancelled() => {
                        info!("cancelled refresh loop");
                        break;
                    }
                }
            }
        });
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::MemoryStorageEngine;
    use crate::error::ControllerError;
    use crate::storage::MemoryReplicaStateStore;
    use async_trait::async_trait;
    use wrh_models::{ConfigVersion, ShardHost, SyncStep, VersionStatus};

    struct FixedSource(Option<ConfigVersion>);

    #[async_trait]
    impl VersionSource for FixedSource {
        async fn fetch_current_version(
            &self,
            group: &str,
        ) -> Result<ConfigVersion, ControllerError> {
            self.0
                .clone()
                .ok_or_else(|| ControllerError::NotFound(group.into()))
        }
    }

    fn published(id: u64) -> ConfigVersion {
        let hosts = [ShardHost::new("r1", "localhost", 5432)].into();
        let mut v = ConfigVersion::new_draft(id, "g1", hosts);
        v.status = VersionStatus::Ready;
        v.publish_order = Some(1);
        v
    }

    async fn replica() -> (Replica, Arc<MemoryReplicaStateStore>) {
        let store = Arc::new(MemoryReplicaStateStore::new());
        let replica = Replica::open(
            store.clone(),
            Arc::new(MemoryStorageEngine::new()),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        (replica, store)
    }

    #[tokio::test]
    async fn sync_requires_controller() {
        let (replica, _) = replica().await;
        assert!(matches!(
            replica.sync_step("g1").await,
            Err(ReplicaError::NotConfigured)
        ));
        assert!(!replica.replica_ready("g1").await);
    }

    #[tokio::test]
    async fn invalid_group_is_rejected() {
        let (replica, _) = replica().await;
        replica
            .set_version_source(Arc::new(FixedSource(None)))
            .await;
        assert!(matches!(
            replica.sync_step("").await,
            Err(ReplicaError::InvalidGroup(_))
        ));
    }

    #[tokio::test]
    async fn configure_persists_settings_and_rejects_bad_port() {
        let (replica, store) = replica().await;
        let mut settings = ControllerSettings {
            master_address: "127.0.0.1".into(),
            master_port: 0,
            identity: "replica-1".into(),
            credential: "secret".into(),
            refresh_interval_secs: 0,
        };
        assert!(replica.configure_controller(settings.clone()).await.is_err());
        assert!(store.load_controller_settings().await.unwrap().is_none());

        settings.master_port = 7070;
        replica.configure_controller(settings.clone()).await.unwrap();
        assert_eq!(
            store.load_controller_settings().await.unwrap(),
            Some(settings)
        );

        let reopened = Replica::open(
            store.clone(),
            Arc::new(MemoryStorageEngine::new()),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        assert_eq!(reopened.settings().await.unwrap().master_port, 7070);
    }

    #[tokio::test]
    async fn each_step_is_persisted() {
        let (replica, store) = replica().await;
        replica
            .set_version_source(Arc::new(FixedSource(Some(published(7)))))
            .await;
        replica.sync_step("g1").await.unwrap();
        let saved = store.load_sync_state("g1").await.unwrap().unwrap();
        assert_eq!(saved.current_step, SyncStep::Fetching);

        assert!(replica.poll_ready("g1", 10).await.unwrap());
        let status = replica.status().await.unwrap();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].step, SyncStep::Converged);
        assert_eq!(status[0].target_version_id, Some(7));
        assert_eq!(status[0].installed_hosts, 1);

        let before = replica.sync_step("g1").await.unwrap();
        let after = replica.sync_step("g1").await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn unpublished_group_never_becomes_ready() {
        let (replica, _) = replica().await;
        replica
            .set_version_source(Arc::new(FixedSource(None)))
            .await;
        assert!(!replica.poll_ready("g1", 20).await.unwrap());
    }

    #[tokio::test]
    async fn refresh_loop_needs_positive_interval() {
        let (replica, _) = replica().await;
        let replica = Arc::new(replica);
        let token = CancellationToken::new();
        assert!(
            replica
                .clone()
                .spawn_refresh_loop(vec!["g1".into()], token.clone())
                .await
                .is_none()
        );
    }
}
