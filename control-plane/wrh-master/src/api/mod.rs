mod handlers;

use crate::{auth::CredentialPolicy, store::VersionStore};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub use handlers::*;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VersionStore>,
    pub credentials: Arc<CredentialPolicy>,
}

impl AppState {
    pub fn new(store: Arc<dyn VersionStore>, credentials: CredentialPolicy) -> Self {
        Self {
            store,
            credentials: Arc::new(credentials),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Version query service
        .route(
            "/api/v1/groups/{group}/current",
            get(handlers::get_current_version),
        )
        // Draft administration
        .route(
            "/api/v1/groups/{group}/hosts",
            post(handlers::add_shard_host).delete(handlers::remove_shard_host),
        )
        .route(
            "/api/v1/groups/{group}/pending",
            get(handlers::get_pending_version)
                .delete(handlers::delete_pending_version),
        )
        .route(
            "/api/v1/groups/{group}/pending/ready",
            post(handlers::mark_pending_version_ready),
        )
        .route(
            "/api/v1/groups/{group}/versions",
            get(handlers::list_versions),
        )
        .route("/healthz", get(handlers::health_check))
        .with_state(state)
}
