//! Storage contracts consumed by the attribution engine.
//!
//! Every call is scoped to an explicit owner. Implementations:
//! - `MemoryStore` (attribution crate): in-process, used by tests and single-node runs
//! - `ClickHouseStore` (clickhouse-client crate): ClickHouse tables

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::column::MatchColumn;
use crate::conversion::Conversion;
use crate::error::Result;
use crate::kpi::Kpi;
use crate::track::Track;

/// Touch event persistence.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a track. Returns its id.
    async fn store(&self, track: &Track) -> Result<Uuid>;

    async fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Track>>;

    /// A visitor's tracks sent strictly before `before`, in touch order
    /// (send time, receipt time, id).
    async fn find_all_by_visitor_before(
        &self,
        owner_id: Uuid,
        anonymous_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Vec<Track>>;

    /// All of a visitor's tracks in touch order.
    async fn find_all_by_visitor(&self, owner_id: Uuid, anonymous_id: &str) -> Result<Vec<Track>>;

    /// A visitor's earliest track by receipt time (ties by id).
    async fn find_earliest_by_visitor(
        &self,
        owner_id: Uuid,
        anonymous_id: &str,
    ) -> Result<Option<Track>>;

    /// Distinct visitors with at least one track where `column == value`.
    async fn find_visitors_matching(
        &self,
        owner_id: Uuid,
        column: MatchColumn,
        value: &str,
    ) -> Result<Vec<String>>;

    /// Distinct visitors with at least one non-empty value in `column`.
    async fn find_visitors_with_dimension(
        &self,
        owner_id: Uuid,
        column: MatchColumn,
    ) -> Result<Vec<String>>;

    /// Liveness probe for health checks.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// KPI persistence.
#[async_trait]
pub trait KpiStore: Send + Sync {
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Kpi>>;

    async fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Kpi>>;

    async fn store(&self, kpi: &Kpi) -> Result<Uuid>;

    /// Overwrite the stored weight data. NOT_FOUND_001 if the KPI is gone.
    async fn update_weight_data(&self, kpi: &Kpi) -> Result<()>;

    /// Returns the number of KPIs removed (0 or 1).
    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<u64>;
}

/// Conversion persistence. Append-only apart from explicit deletes.
#[async_trait]
pub trait ConversionStore: Send + Sync {
    async fn store(&self, conversion: &Conversion) -> Result<Uuid>;

    /// Whether a conversion already links this track to this KPI.
    async fn exists(&self, owner_id: Uuid, track_id: Uuid, kpi_id: Uuid) -> Result<bool>;

    /// Newest first.
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<Conversion>>;

    async fn find_by_kpi(&self, owner_id: Uuid, kpi_id: Uuid) -> Result<Vec<Conversion>>;

    async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<u64>;
}
