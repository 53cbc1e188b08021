//! API routes.

pub mod conversions;
pub mod health;
pub mod kpis;
pub mod metrics;
pub mod pixel;
pub mod reports;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Ingest
        .route("/v1/pixel/track", get(pixel::pixel_handler))
        .route("/v1/tracks", post(pixel::track_handler))
        .route("/v1/tracks/:id/reprocess", post(pixel::reprocess_handler))
        // KPIs
        .route("/v1/kpis", get(kpis::list_handler).post(kpis::create_handler))
        .route("/v1/kpis/:id", get(kpis::get_handler).delete(kpis::delete_handler))
        .route("/v1/kpis/:id/weights/:model", delete(kpis::reset_weights_handler))
        // Reports
        .route("/v1/kpis/:id/journey", get(reports::journey_handler))
        .route("/v1/kpis/:id/first_touch", get(reports::first_touch_handler))
        .route("/v1/kpis/:id/daily_conversions", get(reports::daily_conversions_handler))
        // Conversions
        .route("/v1/conversions", get(conversions::list_handler))
        .route("/v1/conversions/:id", delete(conversions::delete_handler))
        // Ops
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
