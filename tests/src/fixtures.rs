//! Test fixtures and payload generators.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Fresh owner id, formatted for the `X-Owner-Id` header.
pub fn owner() -> String {
    Uuid::new_v4().to_string()
}

/// Fresh visitor id.
pub fn visitor() -> String {
    format!("anon-{}", Uuid::new_v4())
}

/// A point `n` minutes in the past.
pub fn minutes_ago(n: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(n)
}

/// A plain page view.
pub fn page_view(anonymous_id: &str, sent_at: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "anonymousId": anonymous_id,
        "pageURL": "https://example.com/",
        "pagePath": "/",
        "sentAt": sent_at,
    })
}

/// A page view that arrived through a campaign.
pub fn campaign_touch(
    anonymous_id: &str,
    campaign: &str,
    sent_at: DateTime<Utc>,
) -> serde_json::Value {
    serde_json::json!({
        "anonymousId": anonymous_id,
        "pageURL": format!("https://example.com/?utm_campaign={}", campaign),
        "campaignSource": "test",
        "campaignName": campaign,
        "sentAt": sent_at,
    })
}

/// A named interaction, e.g. a signup.
pub fn event_touch(anonymous_id: &str, event: &str, sent_at: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "anonymousId": anonymous_id,
        "event": event,
        "sentAt": sent_at,
    })
}

/// KPI creation body.
pub fn kpi(column: &str, value: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "column": column,
        "value": value,
        "name": name,
    })
}

/// KPI that converts on the `signup` event.
pub fn signup_kpi() -> serde_json::Value {
    kpi("event", "signup", "Signups")
}

/// Base64 `data` parameter for the pixel endpoint.
pub fn pixel_data(payload: &serde_json::Value) -> String {
    STANDARD.encode(payload.to_string())
}
