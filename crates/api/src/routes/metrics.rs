//! Metrics snapshot endpoint.

use axum::Json;
use telemetry::{metrics, MetricsSnapshot};

/// GET /metrics - Current in-process counters as JSON.
pub async fn metrics_handler() -> Json<MetricsSnapshot> {
    Json(metrics().snapshot())
}
