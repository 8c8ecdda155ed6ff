use super::AppState;
use crate::error::VersionError;
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use tracing::{debug, info, warn};
use wrh_models::{
    CREDENTIAL_HEADER, ConfigVersion, HostRequest, IDENTITY_HEADER, ShardHost,
};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn get_current_version(
    State(state): State<AppState>,
    Path(group): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ConfigVersion>, VersionError> {
    let identity = header(&headers, IDENTITY_HEADER);
    if let Err(e) = state
        .credentials
        .verify(identity, header(&headers, CREDENTIAL_HEADER))
    {
        warn!(group = %group, identity = ?identity, "rejected version query");
        return Err(e);
    }
    debug!(group = %group, identity = ?identity, "version query");
    let version = state.store.get_current_version(&group).await?;
    Ok(Json(version))
}

pub async fn add_shard_host(
    State(state): State<AppState>,
    Path(group): Path<String>,
    Json(host): Json<HostRequest>,
) -> Result<Json<ConfigVersion>, VersionError> {
    info!("API: add shard host {} to group {}", host, group);
    let draft = state.store.add_shard_host(&group, host).await?;
    Ok(Json(draft))
}

pub async fn remove_shard_host(
    State(state): State<AppState>,
    Path(group): Path<String>,
    Json(host): Json<ShardHost>,
) -> Result<Json<ConfigVersion>, VersionError> {
    info!("API: remove shard host {} from group {}", host, group);
    let draft = state.store.remove_shard_host(&group, &host).await?;
    Ok(Json(draft))
}

pub async fn mark_pending_version_ready(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<ConfigVersion>, VersionError> {
    info!("API: publish pending version of group {}", group);
    let version = state.store.mark_pending_version_ready(&group).await?;
    Ok(Json(version))
}

pub async fn delete_pending_version(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<ConfigVersion>, VersionError> {
    info!("API: delete pending version of group {}", group);
    let version = state.store.delete_pending_version(&group).await?;
    Ok(Json(version))
}

pub async fn get_pending_version(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<ConfigVersion>, VersionError> {
    state
        .store
        .get_pending_version(&group)
        .await?
        .map(Json)
        .ok_or_else(|| {
            VersionError::NotFound(format!("pending version of group `{group}`"))
        })
}

pub async fn list_versions(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<Vec<ConfigVersion>>, VersionError> {
    Ok(Json(state.store.list_versions(&group).await?))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "wrh-master",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
