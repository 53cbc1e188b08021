//! Engine facade: the entry points the HTTP layer calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_core::error::NotFoundErrorCode;
use engine_core::validation::validate_track;
use engine_core::{
    AttributionModel, Conversion, ConversionStore, Error, EventStore, Kpi, KpiStore, MatchColumn,
    NewKpi, NewTrack, PositionAggregate, Result, Track, ValueCount,
};
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::journey::{JourneyAggregator, DEFAULT_QUERY_TIMEOUT};
use crate::recorder::{ConversionRecorder, RecorderConfig};
use crate::resolver::TouchResolver;

/// Engine settings (the `engine` config section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Record at most one conversion per (track, KPI)
    pub dedupe_conversions: bool,
    /// Deadline for aggregate queries, in seconds
    pub query_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dedupe_conversions: false,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT.as_secs(),
        }
    }
}

/// A track that made it to storage.
#[derive(Debug)]
pub struct RecordedTrack {
    pub id: Uuid,
    /// Conversions recorded for this track
    pub conversions: Vec<Conversion>,
    /// Set when the track was stored but matching or attribution failed.
    /// Conversions that did get written are not listed here.
    pub attribution_error: Option<Error>,
}

/// Attribution engine over an event, KPI and conversion store.
pub struct AttributionEngine {
    events: Arc<dyn EventStore>,
    kpis: Arc<dyn KpiStore>,
    conversions: Arc<dyn ConversionStore>,
    recorder: ConversionRecorder,
    journey: JourneyAggregator,
}

impl AttributionEngine {
    pub fn new(
        events: Arc<dyn EventStore>,
        kpis: Arc<dyn KpiStore>,
        conversions: Arc<dyn ConversionStore>,
        config: EngineConfig,
    ) -> Self {
        let recorder = ConversionRecorder::with_config(
            kpis.clone(),
            conversions.clone(),
            TouchResolver::new(events.clone()),
            RecorderConfig {
                dedupe_conversions: config.dedupe_conversions,
            },
        );
        let journey = JourneyAggregator::new(events.clone(), conversions.clone())
            .with_query_timeout(Duration::from_secs(config.query_timeout_secs));

        Self {
            events,
            kpis,
            conversions,
            recorder,
            journey,
        }
    }

    /// Builds an engine whose three stores are one backend.
    pub fn with_store<S>(store: Arc<S>, config: EngineConfig) -> Self
    where
        S: EventStore + KpiStore + ConversionStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    // === Ingest ===

    /// Validates and stores a track, then runs conversion matching and
    /// attribution for it.
    ///
    /// `Err` means nothing was stored. Once the track is stored the call
    /// succeeds, and an attribution failure is reported on the outcome
    /// together with the track id, so the caller can reprocess it.
    pub async fn record_event(
        &self,
        owner_id: Uuid,
        new: NewTrack,
        ip: Option<String>,
    ) -> Result<RecordedTrack> {
        let m = metrics();
        m.events_in_flight.inc();
        let start = Instant::now();

        let result = self.record_event_inner(owner_id, new, ip).await;

        m.events_in_flight.dec();
        m.record_latency_ms.observe(start.elapsed().as_millis() as u64);
        result
    }

    async fn record_event_inner(
        &self,
        owner_id: Uuid,
        new: NewTrack,
        ip: Option<String>,
    ) -> Result<RecordedTrack> {
        validate_track(&new).inspect_err(|_| metrics().events_failed_validation.inc())?;

        let track = Track::record(owner_id, new, ip);
        let id = self.events.store(&track).await?;
        metrics().events_recorded.inc();

        let recorded = match self.recorder.on_new_event(&track).await {
            Ok(conversions) => RecordedTrack {
                id,
                conversions,
                attribution_error: None,
            },
            Err(e) => {
                warn!(owner_id = %owner_id, track_id = %id, error = %e, "Attribution failed for stored track");
                RecordedTrack {
                    id,
                    conversions: Vec::new(),
                    attribution_error: Some(e),
                }
            }
        };

        debug!(
            owner_id = %owner_id,
            track_id = %id,
            conversions = recorded.conversions.len(),
            "Track recorded"
        );
        Ok(recorded)
    }

    /// Re-runs matching and attribution for an already stored track.
    pub async fn reprocess_event(&self, owner_id: Uuid, track_id: Uuid) -> Result<Vec<Conversion>> {
        let track = self.events.find_by_id(owner_id, track_id).await?.ok_or_else(|| {
            Error::not_found(
                NotFoundErrorCode::Event,
                format!("track {} not found", track_id),
            )
        })?;

        let conversions = self.recorder.on_new_event(&track).await?;
        info!(
            owner_id = %owner_id,
            track_id = %track_id,
            conversions = conversions.len(),
            "Track reprocessed"
        );
        Ok(conversions)
    }

    // === KPIs ===

    pub async fn list_kpis(&self, owner_id: Uuid) -> Result<Vec<Kpi>> {
        self.kpis.find_by_owner(owner_id).await
    }

    pub async fn get_kpi(&self, owner_id: Uuid, kpi_id: Uuid) -> Result<Kpi> {
        self.kpis
            .find_by_id(owner_id, kpi_id)
            .await?
            .ok_or_else(|| {
                Error::not_found(NotFoundErrorCode::Kpi, format!("kpi {} not found", kpi_id))
            })
    }

    /// Rejects invalid KPIs before anything is persisted.
    pub async fn create_kpi(&self, owner_id: Uuid, new: NewKpi) -> Result<Kpi> {
        let kpi = Kpi::create(owner_id, new)?;
        self.kpis.store(&kpi).await?;

        info!(
            owner_id = %owner_id,
            kpi_id = %kpi.id,
            column = %kpi.match_column,
            "KPI created"
        );
        Ok(kpi)
    }

    pub async fn delete_kpi(&self, owner_id: Uuid, kpi_id: Uuid) -> Result<u64> {
        let deleted = self.recorder.delete_kpi(owner_id, kpi_id).await?;
        info!(owner_id = %owner_id, kpi_id = %kpi_id, deleted, "KPI deleted");
        Ok(deleted)
    }

    /// Clears one attribution model's weights on a KPI.
    pub async fn reset_weights(
        &self,
        owner_id: Uuid,
        kpi_id: Uuid,
        model: AttributionModel,
    ) -> Result<bool> {
        let changed = self.recorder.reset_weights(owner_id, kpi_id, model).await?;
        info!(owner_id = %owner_id, kpi_id = %kpi_id, model = %model, changed, "Weights reset");
        Ok(changed)
    }

    // === Reports ===

    pub async fn positional_journey(
        &self,
        owner_id: Uuid,
        dimension: MatchColumn,
        kpi_id: Uuid,
    ) -> Result<Vec<PositionAggregate>> {
        let kpi = self.get_kpi(owner_id, kpi_id).await?;
        self.journey.positional(owner_id, dimension, &kpi).await
    }

    pub async fn first_touch_distribution(
        &self,
        owner_id: Uuid,
        kpi_id: Uuid,
    ) -> Result<Vec<ValueCount>> {
        let kpi = self.get_kpi(owner_id, kpi_id).await?;
        self.journey.first_touch(&kpi).await
    }

    pub async fn daily_conversions(&self, owner_id: Uuid, kpi_id: Uuid) -> Result<Vec<ValueCount>> {
        self.get_kpi(owner_id, kpi_id).await?;
        self.journey.daily_conversions(owner_id, kpi_id).await
    }

    // === Conversions ===

    pub async fn list_conversions(&self, owner_id: Uuid) -> Result<Vec<Conversion>> {
        self.conversions.find_by_owner(owner_id).await
    }

    /// Deleting an unknown conversion is a lookup error, unlike KPIs.
    pub async fn delete_conversion(&self, owner_id: Uuid, conversion_id: Uuid) -> Result<u64> {
        let deleted = self.conversions.delete(owner_id, conversion_id).await?;
        if deleted == 0 {
            return Err(Error::not_found(
                NotFoundErrorCode::Conversion,
                format!("conversion {} not found", conversion_id),
            ));
        }
        info!(owner_id = %owner_id, conversion_id = %conversion_id, "Conversion deleted");
        Ok(deleted)
    }

    /// Storage liveness, for readiness checks.
    pub async fn ping(&self) -> Result<()> {
        self.events.ping().await
    }
}
