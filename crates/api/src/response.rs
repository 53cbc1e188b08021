//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use attribution::RecordedTrack;
use engine_core::Conversion;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

/// Outcome of a POST /v1/tracks.
///
/// The track is stored whenever this is returned. `attribution_error` is
/// set when matching or attribution failed afterwards.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrackResponse {
    pub id: Uuid,
    pub conversions: Vec<Conversion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution_error: Option<ErrorResponse>,
}

impl From<RecordedTrack> for TrackResponse {
    fn from(recorded: RecordedTrack) -> Self {
        Self {
            id: recorded.id,
            conversions: recorded.conversions,
            attribution_error: recorded
                .attribution_error
                .map(|e| ApiError::from(e).response),
        }
    }
}

/// Number of rows removed by a delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

/// Whether a weight reset changed anything.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub changed: bool,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage_connected: bool,
    pub events_in_flight: u64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error carrying an engine error code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::UNAUTHORIZED, "OWNER_001", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<engine_core::Error> for ApiError {
    fn from(err: engine_core::Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match (&err, err.error_code()) {
            (
                engine_core::Error::Validation { message, .. }
                | engine_core::Error::Configuration { message, .. },
                Some(code),
            ) => ApiError {
                status,
                response: ErrorResponse::new("Validation failed", code)
                    .with_details(vec![message.clone()]),
            },
            (
                engine_core::Error::NotFound { message, .. }
                | engine_core::Error::Storage { message, .. },
                Some(code),
            ) => {
                if status.is_server_error() {
                    error!(code, error = %message, "Request failed");
                }
                ApiError::with_code(status, code, message)
            }
            _ => {
                error!(error = %err, "Unexpected engine error");
                ApiError::internal(err.to_string())
            }
        }
    }
}
