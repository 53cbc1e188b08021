//! Tests for error responses.
//!
//! Storage failures and latency are injected through the in-memory store.

use std::time::Duration;

use attribution::EngineConfig;
use axum::http::StatusCode;
use integration_tests::{
    fixtures,
    setup::{create_kpi, first_touch_weight, record_journey, send_track, TestContext},
};
use uuid::Uuid;

/// Test missing owner header returns OWNER_001
#[tokio::test]
async fn test_missing_owner_returns_401() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/v1/kpis").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "OWNER_001");
}

/// Test malformed owner header returns OWNER_001
#[tokio::test]
async fn test_invalid_owner_returns_401() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get("/v1/kpis")
        .add_header("X-Owner-Id", "not-a-uuid")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "OWNER_001");
}

/// Test KPI missing required fields returns VALID_002
#[tokio::test]
async fn test_incomplete_kpi_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/v1/kpis")
        .add_header("X-Owner-Id", &fixtures::owner())
        .json(&serde_json::json!({ "column": "event", "value": "signup" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");
}

/// Test KPI on an unknown column is rejected at creation with CONFIG_001
#[tokio::test]
async fn test_unknown_column_kpi_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();

    let response = server
        .post("/v1/kpis")
        .add_header("X-Owner-Id", &owner)
        .json(&fixtures::kpi("nonexistent_field", "x", "Broken"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "CONFIG_001");

    let response = server.get("/v1/kpis").add_header("X-Owner-Id", &owner).await;
    let kpis: Vec<serde_json::Value> = response.json();
    assert!(kpis.is_empty());
}

/// Test unknown KPI returns NOT_FOUND_001
#[tokio::test]
async fn test_unknown_kpi_returns_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .get(&format!("/v1/kpis/{}", Uuid::new_v4()))
        .add_header("X-Owner-Id", &fixtures::owner())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND_001");
}

/// Test reprocessing an unknown track returns NOT_FOUND_002
#[tokio::test]
async fn test_reprocess_unknown_track_returns_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post(&format!("/v1/tracks/{}/reprocess", Uuid::new_v4()))
        .add_header("X-Owner-Id", &fixtures::owner())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND_002");
}

/// Test deleting an unknown conversion returns NOT_FOUND_003
#[tokio::test]
async fn test_delete_unknown_conversion_returns_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .delete(&format!("/v1/conversions/{}", Uuid::new_v4()))
        .add_header("X-Owner-Id", &fixtures::owner())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND_003");
}

/// Test write failure returns DB_001
#[tokio::test]
async fn test_write_failure_returns_500() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.store.set_fail_on_write(true).await;

    let response = server
        .post("/v1/tracks")
        .add_header("X-Owner-Id", &fixtures::owner())
        .json(&fixtures::page_view(&fixtures::visitor(), fixtures::minutes_ago(0)))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DB_001");
}

/// Test read failure returns DB_002
#[tokio::test]
async fn test_read_failure_returns_500() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.store.set_fail_on_read(true).await;

    let response = server
        .get("/v1/kpis")
        .add_header("X-Owner-Id", &fixtures::owner())
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DB_002");
}

/// Weight persistence failure is reported alongside the stored track's id
#[tokio::test]
async fn test_weight_failure_keeps_conversion() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    let visitor = fixtures::visitor();
    send_track(
        &server,
        &owner,
        &fixtures::campaign_touch(&visitor, "Ads", fixtures::minutes_ago(1)),
    )
    .await;

    ctx.store.set_fail_on_weight_update(true).await;
    let response = server
        .post("/v1/tracks")
        .add_header("X-Owner-Id", &owner)
        .json(&fixtures::event_touch(&visitor, "signup", fixtures::minutes_ago(0)))
        .await;
    ctx.store.set_fail_on_weight_update(false).await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["attribution_error"]["code"], "DB_001");
    let track_id = body["id"].as_str().unwrap().to_string();

    let response = server
        .get("/v1/conversions")
        .add_header("X-Owner-Id", &owner)
        .await;
    let conversions: Vec<serde_json::Value> = response.json();
    assert_eq!(conversions.len(), 1);
    assert_eq!(conversions[0]["trackId"], track_id.as_str());
    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Ads").await, None);

    // The id from the response is enough to replay attribution.
    server
        .post(&format!("/v1/tracks/{}/reprocess", track_id))
        .add_header("X-Owner-Id", &owner)
        .await
        .assert_status_ok();
    assert_eq!(
        first_touch_weight(&server, &owner, kpi_id, "Ads").await,
        Some(1.0)
    );
}

/// Pixel still answers with the GIF when only attribution failed
#[tokio::test]
async fn test_pixel_weight_failure_still_returns_gif() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    let visitor = fixtures::visitor();
    send_track(
        &server,
        &owner,
        &fixtures::campaign_touch(&visitor, "Ads", fixtures::minutes_ago(1)),
    )
    .await;

    ctx.store.set_fail_on_weight_update(true).await;
    let payload = fixtures::event_touch(&visitor, "signup", fixtures::minutes_ago(0));
    let response = server
        .get("/v1/pixel/track")
        .add_header("X-Owner-Id", &owner)
        .add_query_param("data", fixtures::pixel_data(&payload))
        .await;

    ctx.store.set_fail_on_weight_update(false).await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "image/gif"
    );

    let response = server
        .get("/v1/conversions")
        .add_header("X-Owner-Id", &owner)
        .await;
    let conversions: Vec<serde_json::Value> = response.json();
    assert_eq!(conversions.len(), 1);
}

/// Test slow aggregate returns DB_003
#[tokio::test]
async fn test_aggregate_deadline_returns_504() {
    let ctx = TestContext::with_config(EngineConfig {
        query_timeout_secs: 1,
        ..Default::default()
    });
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;
    record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;

    ctx.store
        .set_read_delay(Some(Duration::from_millis(1500)))
        .await;

    let response = server
        .get(&format!("/v1/kpis/{}/first_touch", kpi_id))
        .add_header("X-Owner-Id", &owner)
        .await;

    response.assert_status(StatusCode::GATEWAY_TIMEOUT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DB_003");
}
