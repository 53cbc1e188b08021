//! Track ingestion endpoints.
//!
//! The pixel endpoint takes a standard-base64 JSON payload in the `data`
//! query parameter and always answers a successful record with a 1x1 GIF.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use engine_core::limits::MAX_PIXEL_PAYLOAD_BYTES;
use engine_core::validation::parse_track;
use engine_core::Conversion;
use serde::Deserialize;
use telemetry::metrics;
use tracing::debug;
use uuid::Uuid;

use crate::extractors::{ClientIp, OwnerContext};
use crate::response::{ApiError, TrackResponse};
use crate::state::AppState;

/// Transparent 1x1 GIF.
pub const PIXEL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

#[derive(Debug, Deserialize)]
pub struct PixelQuery {
    #[serde(default)]
    pub data: String,
}

/// Decodes the pixel's base64 `data` parameter into JSON bytes.
pub fn decode_pixel_data(data: &str) -> Result<Vec<u8>, ApiError> {
    // Base64 inflates by 4/3; reject before decoding.
    if data.len() > MAX_PIXEL_PAYLOAD_BYTES * 4 / 3 + 4 {
        return Err(ApiError::with_code(
            StatusCode::BAD_REQUEST,
            "VALID_003",
            "pixel data exceeds size limit",
        ));
    }

    STANDARD
        .decode(data.trim())
        .map_err(|e| ApiError::bad_request(format!("data is not valid base64: {}", e)))
}

/// GET /v1/pixel/track?data=<base64 JSON>
pub async fn pixel_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    ClientIp(ip): ClientIp,
    Query(query): Query<PixelQuery>,
) -> Result<Response, ApiError> {
    let raw = decode_pixel_data(&query.data)?;
    let track = parse_track(&raw).inspect_err(|_| metrics().events_failed_validation.inc())?;

    // Stored is success for the pixel; attribution errors are logged by the engine.
    let recorded = state.engine.record_event(owner.owner_id, track, ip).await?;
    debug!(
        owner_id = %owner.owner_id,
        track_id = %recorded.id,
        attributed = recorded.attribution_error.is_none(),
        "Pixel recorded"
    );

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::CONTENT_TYPE, "image/gif"),
        ],
        PIXEL_GIF,
    )
        .into_response())
}

/// POST /v1/tracks - JSON body. 201 whenever the track was stored.
pub async fn track_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    ClientIp(ip): ClientIp,
    body: Bytes,
) -> Result<(StatusCode, Json<TrackResponse>), ApiError> {
    let track = parse_track(&body).inspect_err(|_| metrics().events_failed_validation.inc())?;
    let recorded = state.engine.record_event(owner.owner_id, track, ip).await?;

    Ok((StatusCode::CREATED, Json(recorded.into())))
}

/// POST /v1/tracks/:id/reprocess - Re-run attribution for a stored track.
pub async fn reprocess_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Conversion>>, ApiError> {
    let conversions = state.engine.reprocess_event(owner.owner_id, id).await?;
    Ok(Json(conversions))
}
