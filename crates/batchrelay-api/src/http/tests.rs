//! Endpoint tests driven through the router with in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use tower::ServiceExt; // for oneshot

use batchrelay_queue::MemoryQueueSink;
use batchrelay_storage::{ItemStatus, MemoryRecordStore};

use super::routes::create_router;
use super::state::AppState;
use crate::auth::{JwtVerifier, VerifierConfig};

const SECRET: &str = "endpoint-test-secret";
const AUDIENCE: &str = "https://trigger.example.com";

struct TestApp {
    router: Router,
    store: Arc<MemoryRecordStore>,
    sink: Arc<MemoryQueueSink>,
}

/// Builds a router over fresh in-memory backends and an HS256 verifier.
fn test_app(batch_size: usize, max_total: usize) -> TestApp {
    let store = MemoryRecordStore::new_shared();
    let sink = MemoryQueueSink::new_shared();
    let verifier = Arc::new(JwtVerifier::new(VerifierConfig {
        expected_audience: AUDIENCE.to_string(),
        hs256_secret: Some(SECRET.to_string()),
        jwks_url: None,
        issuer: None,
        leeway_seconds: 0,
        jwks_cache_ttl: Duration::from_secs(300),
    }));

    let state = AppState::new(
        Arc::clone(&store),
        Arc::clone(&sink),
        verifier,
        batch_size,
        max_total,
    );

    TestApp {
        router: create_router(state),
        store,
        sink,
    }
}

#[derive(Serialize)]
struct TestClaims<'a> {
    aud: &'a str,
    exp: i64,
    sub: &'a str,
}

fn mint_token(audience: &str, expires_in_secs: i64) -> String {
    let claims = TestClaims {
        aud: audience,
        exp: chrono::Utc::now().timestamp() + expires_in_secs,
        sub: "scheduler@example.com",
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn valid_token() -> String {
    mint_token(AUDIENCE, 3600)
}

fn trigger_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/trigger-workflow");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_check_is_always_ok() {
    let app = test_app(10, 100);

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn readiness_reflects_store_availability() {
    let app = test_app(10, 100);
    let ready_request = || {
        Request::builder()
            .uri("/ready")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.router.clone().oneshot(ready_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ready");
    assert_eq!(json["checks"]["record_store"], "ok");

    app.store.set_available(false);
    let response = app.router.oneshot(ready_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["status"], "not_ready");
    assert_eq!(json["checks"]["record_store"], "unavailable");
}

#[tokio::test]
async fn trigger_without_credential_is_401() {
    let app = test_app(10, 100);
    app.store.seed_received("doc", 3);

    let response = app.router.oneshot(trigger_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    // Nothing was claimed or published.
    assert_eq!(app.store.count_with_status(ItemStatus::Received), 3);
    assert_eq!(app.sink.published_count(), 0);
}

#[tokio::test]
async fn trigger_with_non_bearer_scheme_is_401() {
    let app = test_app(10, 100);

    let response = app
        .router
        .oneshot(trigger_request(Some("Basic dXNlcjpwYXNz")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn trigger_with_garbage_token_is_403() {
    let app = test_app(10, 100);
    app.store.seed_received("doc", 3);

    let response = app
        .router
        .oneshot(trigger_request(Some("Bearer not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.count_with_status(ItemStatus::Received), 3);
}

#[tokio::test]
async fn trigger_with_wrong_audience_is_403() {
    let app = test_app(10, 100);
    let token = mint_token("https://other-service.example.com", 3600);

    let response = app
        .router
        .oneshot(trigger_request(Some(&format!("Bearer {token}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn trigger_with_expired_token_is_403() {
    let app = test_app(10, 100);
    let token = mint_token(AUDIENCE, -3600);

    let response = app
        .router
        .oneshot(trigger_request(Some(&format!("Bearer {token}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn trigger_drains_the_backlog_and_reports_the_count() {
    let app = test_app(3, 100);
    app.store.seed_received("doc", 7);
    let auth = format!("Bearer {}", valid_token());

    let response = app
        .router
        .clone()
        .oneshot(trigger_request(Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["processedCount"], 7);
    assert_eq!(
        json["message"],
        "Workflow started. Queued 7 items for processing."
    );
    assert!(!json["batchId"].as_str().unwrap().is_empty());

    assert_eq!(app.store.count_with_status(ItemStatus::Received), 0);
    assert_eq!(app.store.count_with_status(ItemStatus::Queued), 7);
    assert_eq!(app.sink.published_count(), 7);

    // A second trigger finds nothing and succeeds with zero.
    let response = app
        .router
        .oneshot(trigger_request(Some(&auth)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["processedCount"], 0);
    assert_eq!(
        json["message"],
        "Workflow started. Queued 0 items for processing."
    );
}

#[tokio::test]
async fn trigger_honors_the_per_request_cap() {
    let app = test_app(10, 25);
    app.store.seed_received("doc", 30);
    let auth = format!("Bearer {}", valid_token());

    let response = app
        .router
        .oneshot(trigger_request(Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["processedCount"], 25);
    assert_eq!(app.store.count_with_status(ItemStatus::Received), 5);
}

#[tokio::test]
async fn store_outage_is_500() {
    let app = test_app(10, 100);
    app.store.seed_received("doc", 5);
    app.store.set_available(false);
    let auth = format!("Bearer {}", valid_token());

    let response = app
        .router
        .oneshot(trigger_request(Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(app.sink.published_count(), 0);
}

#[tokio::test]
async fn sink_outage_is_500() {
    let app = test_app(10, 100);
    app.store.seed_received("doc", 5);
    app.sink.set_available(false);
    let auth = format!("Bearer {}", valid_token());

    let response = app
        .router
        .oneshot(trigger_request(Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // The claimed batch stays queued for reconciliation.
    assert_eq!(app.store.count_with_status(ItemStatus::Queued), 5);
}

#[tokio::test]
async fn partial_publish_failure_still_succeeds_with_a_warning_suffix() {
    let app = test_app(10, 100);
    app.store.seed_received("doc", 6);
    app.sink.fail_document("doc-0002");
    let auth = format!("Bearer {}", valid_token());

    let response = app
        .router
        .oneshot(trigger_request(Some(&auth)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["processedCount"], 6);
    assert_eq!(
        json["message"],
        "Workflow started. Queued 6 items for processing. Failed to queue 1 items."
    );
    assert_eq!(app.sink.published_count(), 5);
}
