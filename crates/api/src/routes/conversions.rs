//! Conversion endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use engine_core::Conversion;
use uuid::Uuid;

use crate::extractors::OwnerContext;
use crate::response::{ApiError, DeletedResponse};
use crate::state::AppState;

/// GET /v1/conversions - Newest first.
pub async fn list_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
) -> Result<Json<Vec<Conversion>>, ApiError> {
    Ok(Json(state.engine.list_conversions(owner.owner_id).await?))
}

/// DELETE /v1/conversions/:id
pub async fn delete_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = state.engine.delete_conversion(owner.owner_id, id).await?;
    Ok(Json(DeletedResponse { deleted }))
}
