// A replica restarted mid-convergence picks up where its state file left off.
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use wrh_master::{
    AppState, CredentialPolicy, MemoryVersionStore, VersionStore, build_router,
};
use wrh_models::{ControllerSettings, ShardHost, SyncStep};
use wrh_replica::{
    CapabilityError, FileReplicaStateStore, MemoryStorageEngine, Replica,
    ReplicaStateStore, capability::CapabilityOp,
};

async fn spawn_master() -> Result<(Arc<MemoryVersionStore>, u16)> {
    let store = Arc::new(MemoryVersionStore::new());
    let app = build_router(AppState::new(store.clone(), CredentialPolicy::AllowAll));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((store, port))
}

async fn open_replica(
    path: &std::path::Path,
    storage: Arc<MemoryStorageEngine>,
) -> Result<(Replica, Arc<FileReplicaStateStore>)> {
    let store = Arc::new(FileReplicaStateStore::open(path).await?);
    let replica = Replica::open(store.clone(), storage, Duration::from_secs(2)).await?;
    Ok((replica, store))
}

#[tokio::test]
async fn resumes_after_restart_and_capability_failure() -> Result<()> {
    let (master, port) = spawn_master().await?;
    for (name, p) in [("r1", 5432), ("r2", 5433), ("r3", 5434)] {
        master
            .add_shard_host("g1", ShardHost::new(name, "localhost", p))
            .await?;
    }
    let published = master.mark_pending_version_ready("g1").await?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("replica-state.json");
    let storage = Arc::new(MemoryStorageEngine::new());

    {
        let (replica, _) = open_replica(&path, storage.clone()).await?;
        replica
            .configure_controller(ControllerSettings {
                master_address: "127.0.0.1".into(),
                master_port: port,
                identity: "r1".into(),
                credential: String::new(),
                refresh_interval_secs: 0,
            })
            .await?;
        // uninitialized -> fetching -> diffing -> applying additions, one host in
        for _ in 0..4 {
            replica.sync_step("g1").await?;
        }
        storage
            .fail_next(
                CapabilityOp::CreateRemoteSource,
                CapabilityError::retryable("remote catalog unavailable"),
            )
            .await;
        let description = replica.sync_step("g1").await?;
        assert!(description.contains("remote catalog unavailable"));
    }

    let (replica, store) = open_replica(&path, storage.clone()).await?;
    assert_eq!(replica.settings().await.map(|s| s.master_port), Some(port));
    let state = store.load_sync_state("g1").await?.unwrap();
    assert_eq!(state.current_step, SyncStep::ApplyingAdditions);
    assert_eq!(state.installed_host_set.len(), 1);
    assert_eq!(state.pending_additions.len(), 2);
    assert!(state.last_error.is_some());

    assert!(replica.poll_ready("g1", 16).await?);
    let state = store.load_sync_state("g1").await?.unwrap();
    assert_eq!(state.installed_host_set, published.hosts);
    assert!(state.last_error.is_none());
    assert_eq!(storage.query_group("g1").await?.version_id, published.id);
    Ok(())
}

#[tokio::test]
async fn restart_with_empty_storage_reconverges() -> Result<()> {
    let (master, port) = spawn_master().await?;
    master
        .add_shard_host("g1", ShardHost::new("r1", "localhost", 5432))
        .await?;
    master
        .add_shard_host("g1", ShardHost::new("r2", "localhost", 5433))
        .await?;
    let published = master.mark_pending_version_ready("g1").await?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("replica-state.json");
    {
        let (replica, _) =
            open_replica(&path, Arc::new(MemoryStorageEngine::new())).await?;
        replica
            .configure_controller(ControllerSettings {
                master_address: "127.0.0.1".into(),
                master_port: port,
                identity: "r1".into(),
                credential: String::new(),
                refresh_interval_secs: 0,
            })
            .await?;
        assert!(replica.poll_ready("g1", 16).await?);
    }

    // the state file survives, the installed capabilities do not
    let storage = Arc::new(MemoryStorageEngine::new());
    let (replica, store) = open_replica(&path, storage.clone()).await?;
    let state = store.load_sync_state("g1").await?.unwrap();
    assert_eq!(state.current_step, SyncStep::Converged);
    assert!(storage.query_group("g1").await.is_err());

    replica.sync_step("g1").await?;
    assert!(!replica.replica_ready("g1").await);
    let state = store.load_sync_state("g1").await?.unwrap();
    assert_eq!(state.current_step, SyncStep::Diffing);

    assert!(replica.poll_ready("g1", 16).await?);
    let view = storage.query_group("g1").await?;
    assert_eq!(view.version_id, published.id);
    assert_eq!(view.hosts, published.hosts);
    assert_eq!(storage.connection_count("g1").await, 2);
    Ok(())
}
