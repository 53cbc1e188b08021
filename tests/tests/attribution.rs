//! End-to-end tests for conversion recording and first-touch weights.

use axum::http::StatusCode;
use integration_tests::{
    fixtures,
    setup::{create_kpi, first_touch_weight, get_kpi, record_journey, send_track, TestContext},
};

/// The earliest prior touch's campaign gets the credit
#[tokio::test]
async fn test_first_touch_credit() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    record_journey(&server, &owner, &fixtures::visitor(), &["Ads", "Blog"]).await;

    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Ads").await, Some(1.0));
    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Blog").await, None);
}

/// Weights accumulate across visitors
#[tokio::test]
async fn test_weights_accumulate() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;
    record_journey(&server, &owner, &fixtures::visitor(), &["Ads", "Blog"]).await;
    record_journey(&server, &owner, &fixtures::visitor(), &["Blog"]).await;

    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Ads").await, Some(2.0));
    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Blog").await, Some(1.0));
}

/// A conversion with no earlier touches is recorded but credits nothing
#[tokio::test]
async fn test_conversion_without_prior_touches() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    let track_id = record_journey(&server, &owner, &fixtures::visitor(), &[]).await;

    let response = server
        .get("/v1/conversions")
        .add_header("X-Owner-Id", &owner)
        .await;
    let conversions: Vec<serde_json::Value> = response.json();
    assert_eq!(conversions.len(), 1);
    assert_eq!(conversions[0]["trackId"], track_id.to_string());
    assert_eq!(conversions[0]["kpiId"], kpi_id.to_string());

    let kpi = get_kpi(&server, &owner, kpi_id).await;
    assert_eq!(kpi["weightData"], serde_json::json!({}));
}

/// Touches from other visitors and owners never count
#[tokio::test]
async fn test_attribution_is_scoped_to_owner_and_visitor() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let other_owner = fixtures::owner();
    let visitor = fixtures::visitor();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    // Same visitor id under another owner, and another visitor under this owner
    send_track(
        &server,
        &other_owner,
        &fixtures::campaign_touch(&visitor, "Elsewhere", fixtures::minutes_ago(10)),
    )
    .await;
    send_track(
        &server,
        &owner,
        &fixtures::campaign_touch(&fixtures::visitor(), "Stranger", fixtures::minutes_ago(9)),
    )
    .await;

    record_journey(&server, &owner, &visitor, &["Ads"]).await;

    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Ads").await, Some(1.0));
    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Elsewhere").await, None);
    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Stranger").await, None);
}

/// Every KPI matching the same track converts independently
#[tokio::test]
async fn test_multiple_kpis_match_one_track() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let signup = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;
    let also_signup = create_kpi(
        &server,
        &owner,
        &fixtures::kpi("event", "signup", "Signups (copy)"),
    )
    .await;
    let unrelated = create_kpi(&server, &owner, &fixtures::kpi("event", "purchase", "Sales")).await;

    record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;

    assert_eq!(first_touch_weight(&server, &owner, signup, "Ads").await, Some(1.0));
    assert_eq!(first_touch_weight(&server, &owner, also_signup, "Ads").await, Some(1.0));
    assert_eq!(first_touch_weight(&server, &owner, unrelated, "Ads").await, None);
}

/// Reprocessing records the conversion again unless dedupe is enabled
#[tokio::test]
async fn test_reprocess_without_dedupe() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    let track_id = record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;

    let response = server
        .post(&format!("/v1/tracks/{}/reprocess", track_id))
        .add_header("X-Owner-Id", &owner)
        .await;
    response.assert_status_ok();
    let conversions: Vec<serde_json::Value> = response.json();
    assert_eq!(conversions.len(), 1);

    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Ads").await, Some(2.0));
}

#[tokio::test]
async fn test_reprocess_with_dedupe() {
    let ctx = TestContext::with_config(attribution::EngineConfig {
        dedupe_conversions: true,
        ..Default::default()
    });
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    let track_id = record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;

    let response = server
        .post(&format!("/v1/tracks/{}/reprocess", track_id))
        .add_header("X-Owner-Id", &owner)
        .await;
    response.assert_status_ok();
    let conversions: Vec<serde_json::Value> = response.json();
    assert!(conversions.is_empty());

    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Ads").await, Some(1.0));
}

/// Resetting a model clears its weights once
#[tokio::test]
async fn test_reset_weights() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;
    record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;

    let path = format!("/v1/kpis/{}/weights/firstTouch", kpi_id);
    let response = server.delete(&path).add_header("X-Owner-Id", &owner).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["changed"], true);

    let response = server.delete(&path).add_header("X-Owner-Id", &owner).await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["changed"], false);

    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Ads").await, None);
}

/// Test unknown attribution model returns VALID_001
#[tokio::test]
async fn test_reset_unknown_model_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    let response = server
        .delete(&format!("/v1/kpis/{}/weights/lastTouch", kpi_id))
        .add_header("X-Owner-Id", &owner)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// Concurrent conversions on one KPI never lose an increment
#[tokio::test]
async fn test_concurrent_conversions() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;
    let owner_id: uuid::Uuid = owner.parse().unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = ctx.engine.clone();
        handles.push(tokio::spawn(async move {
            let visitor = fixtures::visitor();
            let touch = fixtures::campaign_touch(&visitor, "Ads", fixtures::minutes_ago(5));
            engine
                .record_event(owner_id, serde_json::from_value(touch).unwrap(), None)
                .await
                .unwrap();
            let signup = fixtures::event_touch(&visitor, "signup", fixtures::minutes_ago(0));
            engine
                .record_event(owner_id, serde_json::from_value(signup).unwrap(), None)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(first_touch_weight(&server, &owner, kpi_id, "Ads").await, Some(10.0));
}
