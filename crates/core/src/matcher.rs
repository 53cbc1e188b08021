//! KPI matching.
//!
//! Exact equality only. An absent track field never matches.

use uuid::Uuid;

use crate::column::MatchColumn;
use crate::error::Result;
use crate::kpi::Kpi;
use crate::track::Track;

/// Whether `track` satisfies `kpi`'s rule.
///
/// Fails with CONFIG_001 when the KPI's column is not a known track field.
pub fn matches(track: &Track, kpi: &Kpi) -> Result<bool> {
    let column = kpi.column()?;
    Ok(matches_column(track, column, &kpi.match_value))
}

pub fn matches_column(track: &Track, column: MatchColumn, value: &str) -> bool {
    column.value_of(track) == Some(value)
}

/// A KPI rule with its column already resolved.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub kpi_id: Uuid,
    pub column: MatchColumn,
    pub value: String,
}

impl CompiledRule {
    pub fn compile(kpi: &Kpi) -> Result<Self> {
        Ok(Self {
            kpi_id: kpi.id,
            column: kpi.column()?,
            value: kpi.match_value.clone(),
        })
    }

    pub fn matches(&self, track: &Track) -> bool {
        matches_column(track, self.column, &self.value)
    }
}
