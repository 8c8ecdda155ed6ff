// HTTP surface of the master: draft administration and the version query.
use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use std::sync::Arc;
use tower::ServiceExt;
use wrh_master::{AppState, CredentialPolicy, MemoryVersionStore, build_router};
use wrh_models::{
    CREDENTIAL_HEADER, ConfigVersion, ErrorBody, IDENTITY_HEADER, ShardHost,
    VersionStatus,
};

fn create_test_app(credentials: CredentialPolicy) -> Router {
    let store = Arc::new(MemoryVersionStore::new());
    build_router(AppState::new(store, credentials))
}

fn json_request(method: &str, uri: &str, body: &impl serde::Serialize) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

fn empty_request(method: &str, uri: &str) -> Result<Request<Body>> {
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
async fn health_endpoint() -> Result<()> {
    let app = create_test_app(CredentialPolicy::AllowAll);
    let response = app.oneshot(empty_request("GET", "/healthz")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = read_json(response).await?;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "wrh-master");
    Ok(())
}

#[tokio::test]
async fn draft_publish_lock_cycle() -> Result<()> {
    let app = create_test_app(CredentialPolicy::AllowAll);
    let r1 = ShardHost::new("replica1", "localhost", 5433);
    let r2 = ShardHost::new("replica2", "localhost", 5434);
    let r3 = ShardHost::new("replica3", "localhost", 5435);

    for host in [&r1, &r2] {
        let res = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/groups/g1/hosts", host)?)
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/groups/g1/current")?)
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(empty_request("POST", "/api/v1/groups/g1/pending/ready")?)
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let published: ConfigVersion = read_json(res).await?;
    assert_eq!(published.status, VersionStatus::Ready);
    assert_eq!(published.hosts.len(), 2);

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/groups/g1/hosts", &r3)?)
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let err: ErrorBody = read_json(res).await?;
    assert_eq!(err.error.code, "VERSION_LOCKED");

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", "/api/v1/groups/g1/pending")?)
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/groups/g1/hosts", &r3)?)
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/groups/g1/current")?)
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let current: ConfigVersion = read_json(res).await?;
    assert_eq!(current.id, published.id);

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/groups/g1/versions")?)
        .await?;
    let history: Vec<ConfigVersion> = read_json(res).await?;
    assert_eq!(history.len(), 2);
    assert!(history[1].is_draft());
    Ok(())
}

#[tokio::test]
async fn pending_operations_without_draft_conflict() -> Result<()> {
    let app = create_test_app(CredentialPolicy::AllowAll);
    let res = app
        .clone()
        .oneshot(empty_request("POST", "/api/v1/groups/g1/pending/ready")?)
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let err: ErrorBody = read_json(res).await?;
    assert_eq!(err.error.code, "NO_DRAFT_EXISTS");

    let res = app
        .oneshot(empty_request("GET", "/api/v1/groups/g1/pending")?)
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn invalid_host_is_a_bad_request() -> Result<()> {
    let app = create_test_app(CredentialPolicy::AllowAll);
    let res = app
        .oneshot(json_request(
            "POST",
            "/api/v1/groups/g1/hosts",
            &ShardHost::new("", "localhost", 5433),
        )?)
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: ErrorBody = read_json(res).await?;
    assert_eq!(err.error.code, "INVALID_HOST");
    Ok(())
}

#[tokio::test]
async fn version_query_checks_credentials() -> Result<()> {
    let app = create_test_app(CredentialPolicy::parse("replica1:secret").unwrap());
    let host = ShardHost::new("replica1", "localhost", 5433);
    app.clone()
        .oneshot(json_request("POST", "/api/v1/groups/g1/hosts", &host)?)
        .await?;
    app.clone()
        .oneshot(empty_request("POST", "/api/v1/groups/g1/pending/ready")?)
        .await?;

    let res = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/groups/g1/current")?)
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/api/v1/groups/g1/current")
        .header(IDENTITY_HEADER, "replica1")
        .header(CREDENTIAL_HEADER, "nope")
        .body(Body::empty())?;
    assert_eq!(app.clone().oneshot(wrong).await?.status(), StatusCode::UNAUTHORIZED);

    let good = Request::builder()
        .uri("/api/v1/groups/g1/current")
        .header(IDENTITY_HEADER, "replica1")
        .header(CREDENTIAL_HEADER, "secret")
        .body(Body::empty())?;
    let res = app.oneshot(good).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let current: ConfigVersion = read_json(res).await?;
    assert!(current.hosts.contains(&host));
    Ok(())
}
