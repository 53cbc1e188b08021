//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};
use tracing::warn;

use crate::response::HealthResponse;
use crate::state::AppState;

/// Probes the store and records the result in the health registry.
async fn refresh_storage_health(state: &AppState) -> bool {
    match state.engine.ping().await {
        Ok(()) => {
            health().storage.set_healthy();
            true
        }
        Err(e) => {
            warn!(error = %e, "Storage health check failed");
            health().storage.set_unhealthy(e.to_string());
            false
        }
    }
}

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    refresh_storage_health(&state).await;
    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        storage_connected: health().storage.is_healthy(),
        events_in_flight: metrics().events_in_flight.get(),
    })
}

/// GET /health/ready - Readiness probe (can accept traffic).
pub async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    if refresh_storage_health(&state).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
