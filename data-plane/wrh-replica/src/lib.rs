pub mod capability;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod readiness;
pub mod replica;
pub mod server;
pub mod storage;

pub use capability::{MemoryStorageEngine, StorageEngine};
pub use client::{HttpControllerClient, VersionSource};
pub use config::ReplicaConfig;
pub use engine::ConvergenceEngine;
pub use error::{CapabilityError, ControllerError, ReplicaError};
pub use readiness::is_ready;
pub use replica::Replica;
pub use storage::{
    FileReplicaStateStore, MemoryReplicaStateStore, ReplicaStateStore,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Open the local state store described by `config`.
pub async fn open_state_store(
    config: &ReplicaConfig,
) -> anyhow::Result<Arc<dyn ReplicaStateStore>> {
    let store: Arc<dyn ReplicaStateStore> = match &config.state_path {
        Some(path) => {
            info!("using replica state file {}", path);
            Arc::new(FileReplicaStateStore::open(path).await?)
        }
        None => Arc::new(MemoryReplicaStateStore::new()),
    };
    Ok(store)
}

pub async fn start_replica(config: ReplicaConfig) -> anyhow::Result<()> {
    let store = open_state_store(&config).await?;
    let replica = Replica::open(
        store,
        Arc::new(MemoryStorageEngine::new()),
        Duration::from_millis(config.request_timeout_ms),
    )
    .await?;
    if let Some(settings) = config.controller_settings() {
        replica.configure_controller(settings).await?;
    }
    let replica = Arc::new(replica);

    let token = CancellationToken::new();
    let refresh = replica
        .clone()
        .spawn_refresh_loop(config.group_list(), token.clone())
        .await;

    let listener =
        TcpListener::bind(format!("0.0.0.0:{}", config.status_port)).await?;
    info!("wrh replica status listening on port {}", config.status_port);
    axum::serve(listener, server::build_router(replica))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    token.cancel();
    if let Some(handle) = refresh {
        handle.await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("unable to listen for shutdown signal: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("unable to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
