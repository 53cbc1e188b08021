//! Request extractors.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::response::ApiError;

/// Header carrying the account the request acts for.
pub const OWNER_HEADER: &str = "X-Owner-Id";

/// Owner identity for the request.
///
/// Taken from the `X-Owner-Id` header, or the `owner` query parameter for
/// pixel requests that cannot set headers. Resolving it from credentials
/// happens upstream of this service.
#[derive(Debug, Clone, Copy)]
pub struct OwnerContext {
    pub owner_id: Uuid,
}

#[derive(Deserialize)]
struct OwnerQuery {
    owner: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for OwnerContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = match parts.headers.get(OWNER_HEADER) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| ApiError::unauthorized("X-Owner-Id is not valid ASCII"))?
                    .to_string(),
            ),
            None => Query::<OwnerQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|q| q.0.owner),
        };

        let raw = raw.ok_or_else(|| ApiError::unauthorized("Missing X-Owner-Id header"))?;

        let owner_id = Uuid::parse_str(raw.trim())
            .map_err(|_| ApiError::unauthorized("X-Owner-Id must be a UUID"))?;

        Ok(OwnerContext { owner_id })
    }
}

/// Client IP address.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Try X-Forwarded-For first (for proxied requests)
        if let Some(xff) = parts.headers.get("X-Forwarded-For") {
            if let Ok(xff_str) = xff.to_str() {
                // Take the first IP in the chain
                if let Some(ip) = xff_str.split(',').next().map(str::trim).filter(|ip| !ip.is_empty()) {
                    return Ok(ClientIp(Some(ip.to_string())));
                }
            }
        }

        if let Some(real_ip) = parts.headers.get("X-Real-IP") {
            if let Ok(ip) = real_ip.to_str() {
                return Ok(ClientIp(Some(ip.trim().to_string())));
            }
        }

        Ok(ClientIp(None))
    }
}
