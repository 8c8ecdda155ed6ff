use crate::error::ReplicaError;
use crate::replica::Replica;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use wrh_models::GroupSyncStatus;

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub group: String,
    pub ready: bool,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub group: String,
    pub description: String,
}

pub fn build_router(replica: Arc<Replica>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/ready/{group}", get(ready))
        .route("/sync/{group}", post(sync))
        .route("/healthz", get(health_check))
        .with_state(replica)
}

async fn status(
    State(replica): State<Arc<Replica>>,
) -> Result<Json<Vec<GroupSyncStatus>>, ReplicaError> {
    Ok(Json(replica.status().await?))
}

async fn ready(
    State(replica): State<Arc<Replica>>,
    Path(group): Path<String>,
) -> Json<ReadinessResponse> {
    let ready = replica.replica_ready(&group).await;
    Json(ReadinessResponse { group, ready })
}

async fn sync(
    State(replica): State<Arc<Replica>>,
    Path(group): Path<String>,
) -> Result<Json<SyncResponse>, ReplicaError> {
    let description = replica.sync_step(&group).await?;
    info!(group = %group, "API: sync step: {}", description);
    Ok(Json(SyncResponse { group, description }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "wrh-replica",
    }))
}
