//! Tests for health check and metrics endpoints.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert!(body.get("status").is_some(), "Response should have 'status' field");
    assert!(
        body.get("storage_connected").is_some(),
        "Response should have 'storage_connected' field"
    );
    assert!(
        body.get("events_in_flight").is_some(),
        "Response should have 'events_in_flight' field"
    );
}

/// Test /health/live always returns 200 OK
#[tokio::test]
async fn test_liveness_probe() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health/live").await;
    response.assert_status_ok();
}

/// Readiness follows the store: memory store is ready, failing store is not
#[tokio::test]
async fn test_readiness_probe_tracks_storage() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server.get("/health/ready").await.assert_status_ok();

    ctx.store.set_fail_on_read(true).await;
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    ctx.store.set_fail_on_read(false).await;
    server.get("/health/ready").await.assert_status_ok();
}

/// Test health endpoints do not require an owner
#[tokio::test]
async fn test_health_endpoints_no_owner_required() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for path in ["/health", "/health/live", "/metrics"] {
        let response = server.get(path).await;
        assert_ne!(
            response.status_code(),
            StatusCode::UNAUTHORIZED,
            "{} should not require an owner",
            path
        );
    }
}

/// Metrics count recorded tracks and conversions
#[tokio::test]
async fn test_metrics_snapshot() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    integration_tests::setup::create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    let before: serde_json::Value = server.get("/metrics").await.json();

    integration_tests::setup::record_journey(&server, &owner, &fixtures::visitor(), &["Ads"])
        .await;

    let after: serde_json::Value = server.get("/metrics").await.json();
    let delta = |key: &str| after[key].as_u64().unwrap() - before[key].as_u64().unwrap();

    // Other tests in this binary may record concurrently
    assert!(delta("events_recorded") >= 2);
    assert!(delta("conversions_recorded") >= 1);
    assert!(delta("weight_updates") >= 1);
}
