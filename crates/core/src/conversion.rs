//! Conversion records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Join record: a track satisfied a KPI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub track_id: Uuid,
    pub kpi_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Conversion {
    pub fn new(owner_id: Uuid, track_id: Uuid, kpi_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner_id,
            track_id,
            kpi_id,
            created_at: Utc::now(),
        }
    }
}
