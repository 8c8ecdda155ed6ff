pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod store;

pub use api::{AppState, build_router};
pub use auth::CredentialPolicy;
pub use config::MasterConfig;
pub use error::{VersionError, VersionResult};
pub use store::{MemoryVersionStore, VersionStore};

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Build the version store and credential table described by `config`.
pub async fn build_state(config: &MasterConfig) -> anyhow::Result<AppState> {
    let store = match &config.snapshot_dir {
        Some(dir) => {
            info!("loading version snapshots from {}", dir);
            MemoryVersionStore::with_snapshot_dir(dir).await?
        }
        None => MemoryVersionStore::new(),
    };
    let credentials = CredentialPolicy::parse(
        config.replica_credentials.as_deref().unwrap_or_default(),
    )
    .map_err(anyhow::Error::msg)?;
    Ok(AppState::new(Arc::new(store), credentials))
}

pub async fn start_server(config: MasterConfig) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let router = build_router(state);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.http_port)).await?;
    info!("wrh master listening on port {}", config.http_port);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
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
