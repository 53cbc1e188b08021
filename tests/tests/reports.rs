//! Tests for the journey, first-touch and daily conversion reports.

use axum::http::StatusCode;
use integration_tests::{
    fixtures,
    setup::{create_kpi, record_journey, send_track, TestContext},
};

/// Positions count back from the earliest touch before the first conversion
#[tokio::test]
async fn test_positional_journey() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    record_journey(&server, &owner, &fixtures::visitor(), &["Ads", "Blog"]).await;
    record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;

    let response = server
        .get(&format!("/v1/kpis/{}/journey", kpi_id))
        .add_header("X-Owner-Id", &owner)
        .await;
    response.assert_status_ok();

    let rows: serde_json::Value = response.json();
    assert_eq!(
        rows,
        serde_json::json!([
            { "value": "Ads", "position": 1, "count": 2 },
            { "value": "Blog", "position": 2, "count": 1 },
        ])
    );
}

/// Visitors who never converted contribute nothing
#[tokio::test]
async fn test_journey_ignores_unconverted_visitors() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    send_track(
        &server,
        &owner,
        &fixtures::campaign_touch(&fixtures::visitor(), "Ads", fixtures::minutes_ago(1)),
    )
    .await;

    let response = server
        .get(&format!("/v1/kpis/{}/journey", kpi_id))
        .add_header("X-Owner-Id", &owner)
        .await;
    response.assert_status_ok();
    let rows: Vec<serde_json::Value> = response.json();
    assert!(rows.is_empty());
}

/// Journey can group by any known track field
#[tokio::test]
async fn test_journey_by_other_dimension() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;

    let response = server
        .get(&format!("/v1/kpis/{}/journey", kpi_id))
        .add_header("X-Owner-Id", &owner)
        .add_query_param("dimension", "campaign_source")
        .await;
    response.assert_status_ok();
    let rows: serde_json::Value = response.json();
    assert_eq!(
        rows,
        serde_json::json!([{ "value": "test", "position": 1, "count": 1 }])
    );
}

/// Test unknown dimension returns CONFIG_001
#[tokio::test]
async fn test_journey_unknown_dimension_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    let response = server
        .get(&format!("/v1/kpis/{}/journey", kpi_id))
        .add_header("X-Owner-Id", &owner)
        .add_query_param("dimension", "utm_whatever")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "CONFIG_001");
}

/// First-touch distribution counts each converted visitor's earliest campaign
#[tokio::test]
async fn test_first_touch_distribution() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    record_journey(&server, &owner, &fixtures::visitor(), &["Ads", "Blog"]).await;
    record_journey(&server, &owner, &fixtures::visitor(), &["Blog"]).await;
    record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;

    let response = server
        .get(&format!("/v1/kpis/{}/first_touch", kpi_id))
        .add_header("X-Owner-Id", &owner)
        .await;
    response.assert_status_ok();

    let rows: serde_json::Value = response.json();
    assert_eq!(
        rows,
        serde_json::json!([
            { "value": "Ads", "count": 2 },
            { "value": "Blog", "count": 1 },
        ])
    );
}

/// Daily buckets use the conversion's UTC day
#[tokio::test]
async fn test_daily_conversions() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    record_journey(&server, &owner, &fixtures::visitor(), &["Ads"]).await;
    record_journey(&server, &owner, &fixtures::visitor(), &[]).await;

    let response = server
        .get(&format!("/v1/kpis/{}/daily_conversions", kpi_id))
        .add_header("X-Owner-Id", &owner)
        .await;
    response.assert_status_ok();

    let rows: Vec<serde_json::Value> = response.json();
    let total: u64 = rows.iter().filter_map(|r| r["count"].as_u64()).sum();
    assert_eq!(total, 2);
    assert!(rows
        .iter()
        .all(|r| r["value"].as_str().is_some_and(|day| day.len() == 10)));
}

/// Reports on another owner's KPI are not found
#[tokio::test]
async fn test_reports_are_owner_scoped() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let owner = fixtures::owner();
    let kpi_id = create_kpi(&server, &owner, &fixtures::signup_kpi()).await;

    for report in ["journey", "first_touch", "daily_conversions"] {
        let response = server
            .get(&format!("/v1/kpis/{}/{}", kpi_id, report))
            .add_header("X-Owner-Id", &fixtures::owner())
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "NOT_FOUND_001", "report {}", report);
    }
}
