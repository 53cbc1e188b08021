//! KPI endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use engine_core::{AttributionModel, Kpi, NewKpi};
use uuid::Uuid;

use crate::extractors::OwnerContext;
use crate::response::{ApiError, DeletedResponse, ResetResponse};
use crate::state::AppState;

/// GET /v1/kpis
pub async fn list_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
) -> Result<Json<Vec<Kpi>>, ApiError> {
    Ok(Json(state.engine.list_kpis(owner.owner_id).await?))
}

/// POST /v1/kpis
pub async fn create_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    payload: Result<Json<NewKpi>, axum::extract::rejection::JsonRejection>,
) -> Result<(StatusCode, Json<Kpi>), ApiError> {
    let Json(new) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let kpi = state.engine.create_kpi(owner.owner_id, new).await?;
    Ok((StatusCode::CREATED, Json(kpi)))
}

/// GET /v1/kpis/:id
pub async fn get_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Kpi>, ApiError> {
    Ok(Json(state.engine.get_kpi(owner.owner_id, id).await?))
}

/// DELETE /v1/kpis/:id
pub async fn delete_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = state.engine.delete_kpi(owner.owner_id, id).await?;
    Ok(Json(DeletedResponse { deleted }))
}

/// DELETE /v1/kpis/:id/weights/:model
pub async fn reset_weights_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path((id, model)): Path<(Uuid, String)>,
) -> Result<Json<ResetResponse>, ApiError> {
    let model: AttributionModel = model.parse()?;
    let changed = state.engine.reset_weights(owner.owner_id, id, model).await?;
    Ok(Json(ResetResponse { changed }))
}
