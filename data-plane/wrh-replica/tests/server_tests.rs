use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wrh_models::ErrorBody;
use wrh_replica::{
    MemoryReplicaStateStore, MemoryStorageEngine, Replica, server::build_router,
};

async fn unconfigured_replica() -> Result<Arc<Replica>> {
    let replica = Replica::open(
        Arc::new(MemoryReplicaStateStore::new()),
        Arc::new(MemoryStorageEngine::new()),
        Duration::from_secs(1),
    )
    .await?;
    Ok(Arc::new(replica))
}

fn request(method: &str, uri: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())?)
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: axum::response::Response,
) -> Result<T> {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[tokio::test]
async fn health_and_empty_status() -> Result<()> {
    let app = build_router(unconfigured_replica().await?);

    let response = app.clone().oneshot(request("GET", "/healthz")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = read_json(response).await?;
    assert_eq!(body["service"], "wrh-replica");

    let response = app.oneshot(request("GET", "/status")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Vec<serde_json::Value> = read_json(response).await?;
    assert!(body.is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_group_is_not_ready() -> Result<()> {
    let app = build_router(unconfigured_replica().await?);
    let response = app.oneshot(request("GET", "/ready/g1")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = read_json(response).await?;
    assert_eq!(body["group"], "g1");
    assert_eq!(body["ready"], false);
    Ok(())
}

#[tokio::test]
async fn sync_without_controller_is_unavailable() -> Result<()> {
    let app = build_router(unconfigured_replica().await?);
    let response = app.oneshot(request("POST", "/sync/g1")?).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = read_json(response).await?;
    assert_eq!(body.error.code, "NOT_CONFIGURED");
    Ok(())
}
