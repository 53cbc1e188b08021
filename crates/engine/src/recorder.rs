//! Conversion recording and first-touch weight updates.
//!
//! For each new track:
//! 1. Resolve every KPI rule for the owner (any broken rule aborts here,
//!    before anything is written)
//! 2. For each matching KPI, persist a conversion
//! 3. Resolve the visitor's prior touches
//! 4. Credit the first touch's campaign on the KPI's weights and persist
//!    the KPI if the weights changed
//!
//! Steps 2 to 4 run under the KPI's lock. KPI deletes and weight resets
//! take the same lock.
//!
//! Conversion and weight writes are not atomic. If step 3 or 4 fails the
//! conversion stays recorded and the error is returned to the caller
//! without retrying, since a retry would count the conversion twice.

use std::sync::Arc;

use engine_core::error::NotFoundErrorCode;
use engine_core::matcher::CompiledRule;
use engine_core::{
    adjust_weight, clear_weights_for_model, AttributionModel, Conversion, ConversionStore, Error,
    Kpi, KpiStore, Result, Track, CAMPAIGN_NAME_ATTRIBUTE,
};
use telemetry::metrics;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::locks::KpiLocks;
use crate::resolver::TouchResolver;

/// Recorder configuration.
#[derive(Debug, Clone, Default)]
pub struct RecorderConfig {
    /// Skip (track, KPI) pairs that already have a conversion
    pub dedupe_conversions: bool,
}

/// Matches tracks against KPIs and applies attribution.
pub struct ConversionRecorder {
    kpis: Arc<dyn KpiStore>,
    conversions: Arc<dyn ConversionStore>,
    resolver: TouchResolver,
    locks: KpiLocks,
    config: RecorderConfig,
}

impl ConversionRecorder {
    pub fn new(
        kpis: Arc<dyn KpiStore>,
        conversions: Arc<dyn ConversionStore>,
        resolver: TouchResolver,
    ) -> Self {
        Self::with_config(kpis, conversions, resolver, RecorderConfig::default())
    }

    pub fn with_config(
        kpis: Arc<dyn KpiStore>,
        conversions: Arc<dyn ConversionStore>,
        resolver: TouchResolver,
        config: RecorderConfig,
    ) -> Self {
        Self {
            kpis,
            conversions,
            resolver,
            locks: KpiLocks::new(),
            config,
        }
    }

    /// Runs matching and attribution for a stored track.
    ///
    /// Returns the conversions recorded by this call. Matching KPIs are
    /// processed independently; if any of them fails, the remaining ones
    /// still run and the first error is returned.
    pub async fn on_new_event(&self, track: &Track) -> Result<Vec<Conversion>> {
        let kpis = self.kpis.find_by_owner(track.owner_id).await?;

        let rules = kpis
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()
            .inspect_err(|_| metrics().configuration_errors.inc())?;

        let mut recorded = Vec::new();
        let mut first_error = None;

        for rule in rules.iter().filter(|r| r.matches(track)) {
            debug!(
                track_id = %track.id,
                kpi_id = %rule.kpi_id,
                column = %rule.column,
                "Track matched KPI"
            );

            match self.convert(track, rule.kpi_id).await {
                Ok(Some(conversion)) => recorded.push(conversion),
                Ok(None) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(recorded),
        }
    }

    /// Records one (track, KPI) conversion and credits its first touch.
    ///
    /// The KPI's lock is held from the de-duplication check through the
    /// weight write, so concurrent replays of one track see each other.
    async fn convert(&self, track: &Track, kpi_id: Uuid) -> Result<Option<Conversion>> {
        let _guard = self.locks.lock(kpi_id).await;

        if self.config.dedupe_conversions
            && self
                .conversions
                .exists(track.owner_id, track.id, kpi_id)
                .await?
        {
            metrics().conversions_deduplicated.inc();
            debug!(track_id = %track.id, kpi_id = %kpi_id, "Conversion already recorded");
            return Ok(None);
        }

        let conversion = Conversion::new(track.owner_id, track.id, kpi_id);
        self.conversions.store(&conversion).await?;
        metrics().conversions_recorded.inc();

        if let Err(e) = self.attribute(track, kpi_id).await {
            metrics().weight_update_failures.inc();
            warn!(
                track_id = %track.id,
                kpi_id = %kpi_id,
                conversion_id = %conversion.id,
                error = %e,
                "Conversion recorded but weights not updated"
            );
            return Err(e);
        }

        Ok(Some(conversion))
    }

    /// Caller holds the KPI's lock.
    async fn attribute(&self, track: &Track, kpi_id: Uuid) -> Result<()> {
        let prior = self.resolver.prior_touches(track).await?;

        let Some(first) = prior.first() else {
            debug!(track_id = %track.id, kpi_id = %kpi_id, "No prior touches to credit");
            return Ok(());
        };

        let campaign = first.campaign_name_or_empty();
        let changed = self
            .apply_weights(track.owner_id, kpi_id, |kpi| {
                adjust_weight(
                    kpi,
                    AttributionModel::FirstTouch,
                    CAMPAIGN_NAME_ATTRIBUTE,
                    campaign,
                    1.0,
                )
            })
            .await?;

        debug!(
            kpi_id = %kpi_id,
            campaign = campaign,
            changed = changed,
            "First touch credited"
        );
        Ok(())
    }

    /// Clears one model's weights on a KPI. Returns whether anything changed.
    pub async fn reset_weights(
        &self,
        owner_id: Uuid,
        kpi_id: Uuid,
        model: AttributionModel,
    ) -> Result<bool> {
        let _guard = self.locks.lock(kpi_id).await;
        self.apply_weights(owner_id, kpi_id, |kpi| clear_weights_for_model(kpi, model))
            .await
    }

    /// Deletes a KPI under its lock, so no weight write in flight can
    /// bring it back. Returns the number of KPIs removed.
    pub async fn delete_kpi(&self, owner_id: Uuid, kpi_id: Uuid) -> Result<u64> {
        let _guard = self.locks.lock(kpi_id).await;
        self.kpis.delete(owner_id, kpi_id).await
    }

    /// Read-modify-write of a KPI's weights. Caller holds the KPI's lock.
    async fn apply_weights<F>(&self, owner_id: Uuid, kpi_id: Uuid, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut Kpi) -> bool + Send,
    {
        let mut kpi = self
            .kpis
            .find_by_id(owner_id, kpi_id)
            .await?
            .ok_or_else(|| {
                Error::not_found(NotFoundErrorCode::Kpi, format!("kpi {} not found", kpi_id))
            })?;

        let changed = apply(&mut kpi);
        if changed {
            self.kpis.update_weight_data(&kpi).await?;
            metrics().weight_updates.inc();
        }
        Ok(changed)
    }
}
