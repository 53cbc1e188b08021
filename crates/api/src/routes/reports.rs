//! Reporting endpoints over a KPI.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use engine_core::{MatchColumn, PositionAggregate, ValueCount};
use serde::Deserialize;
use uuid::Uuid;

use crate::extractors::OwnerContext;
use crate::response::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JourneyQuery {
    /// Track field to group touches by
    pub dimension: Option<String>,
}

/// GET /v1/kpis/:id/journey?dimension=campaign_name
pub async fn journey_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
    Query(query): Query<JourneyQuery>,
) -> Result<Json<Vec<PositionAggregate>>, ApiError> {
    let dimension = match query.dimension.as_deref() {
        Some(raw) => raw.parse::<MatchColumn>()?,
        None => MatchColumn::CampaignName,
    };

    let rows = state
        .engine
        .positional_journey(owner.owner_id, dimension, id)
        .await?;
    Ok(Json(rows))
}

/// GET /v1/kpis/:id/first_touch
pub async fn first_touch_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ValueCount>>, ApiError> {
    Ok(Json(
        state
            .engine
            .first_touch_distribution(owner.owner_id, id)
            .await?,
    ))
}

/// GET /v1/kpis/:id/daily_conversions
pub async fn daily_conversions_handler(
    State(state): State<AppState>,
    owner: OwnerContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ValueCount>>, ApiError> {
    Ok(Json(state.engine.daily_conversions(owner.owner_id, id).await?))
}
