//! KPI (conversion rule) definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::column::MatchColumn;
use crate::error::{Error, Result, ValidationErrorCode};
use crate::weights::WeightData;

/// KPI creation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewKpi {
    /// Track field to inspect, e.g. "campaign_name"
    #[serde(default)]
    pub column: String,
    /// Value that must be observed for a match
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub value: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub name: String,
    pub target: Option<i64>,
}

impl NewKpi {
    /// Column, value and name must all be non-empty.
    pub fn is_valid(&self) -> bool {
        !self.column.is_empty() && !self.value.is_empty() && !self.name.is_empty()
    }
}

/// A stored conversion rule with its accumulated weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(rename = "column")]
    pub match_column: String,
    #[serde(rename = "value")]
    pub match_value: String,
    pub name: String,
    pub target: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub weight_data: WeightData,
}

impl Kpi {
    /// Validates a creation request and builds the KPI for `owner_id`.
    ///
    /// Rejects missing fields (VALID_002), oversized fields (VALID_003) and
    /// unknown columns (CONFIG_001), in that order.
    pub fn create(owner_id: Uuid, new: NewKpi) -> Result<Self> {
        if !new.is_valid() {
            return Err(Error::validation(
                ValidationErrorCode::MissingKpiFields,
                "column, value and name are required",
            ));
        }

        new.validate().map_err(|e| {
            Error::validation(ValidationErrorCode::FieldTooLong, format!("kpi: {}", e))
        })?;

        new.column.parse::<MatchColumn>()?;

        Ok(Self {
            id: Uuid::now_v7(),
            owner_id,
            match_column: new.column,
            match_value: new.value,
            name: new.name,
            target: new.target,
            created_at: Utc::now(),
            weight_data: WeightData::default(),
        })
    }

    /// Resolves the stored column name.
    ///
    /// Rows written before the column set was closed may not parse.
    pub fn column(&self) -> Result<MatchColumn> {
        self.match_column.parse().map_err(|e| match e {
            Error::Configuration { code, message, http_status } => Error::Configuration {
                code,
                message: format!("kpi {}: {}", self.id, message),
                http_status,
            },
            other => other,
        })
    }
}
