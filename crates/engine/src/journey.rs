//! Read-side journey aggregates.
//!
//! Computed fresh from the event store on every call. Each query runs
//! under the configured deadline; dropping the returned future also
//! cancels the in-flight store calls.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_core::error::DbErrorCode;
use engine_core::matcher::CompiledRule;
use engine_core::{
    ConversionStore, Error, EventStore, Kpi, MatchColumn, PositionAggregate, Result, ValueCount,
};
use telemetry::metrics;
use tracing::debug;
use uuid::Uuid;

use crate::resolver::sort_touches;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Computes positional, first-touch and daily conversion aggregates.
pub struct JourneyAggregator {
    events: Arc<dyn EventStore>,
    conversions: Arc<dyn ConversionStore>,
    query_timeout: Duration,
}

impl JourneyAggregator {
    pub fn new(events: Arc<dyn EventStore>, conversions: Arc<dyn ConversionStore>) -> Self {
        Self {
            events,
            conversions,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Counts dimension values by their 1-based position before each
    /// visitor's first conversion on `kpi`.
    ///
    /// Only dimension-bearing touches sent strictly before the first
    /// matching touch are numbered. Rows are ordered by position, then
    /// count descending, then value.
    pub async fn positional(
        &self,
        owner_id: Uuid,
        dimension: MatchColumn,
        kpi: &Kpi,
    ) -> Result<Vec<PositionAggregate>> {
        self.with_deadline("positional journey", self.positional_inner(owner_id, dimension, kpi))
            .await
    }

    async fn positional_inner(
        &self,
        owner_id: Uuid,
        dimension: MatchColumn,
        kpi: &Kpi,
    ) -> Result<Vec<PositionAggregate>> {
        let rule = CompiledRule::compile(kpi)?;

        let converted: HashSet<String> = self
            .events
            .find_visitors_matching(owner_id, rule.column, &rule.value)
            .await?
            .into_iter()
            .collect();

        let mut visitors: Vec<String> = self
            .events
            .find_visitors_with_dimension(owner_id, dimension)
            .await?
            .into_iter()
            .filter(|v| converted.contains(v))
            .collect();
        visitors.sort();
        visitors.dedup();

        let mut counts: BTreeMap<(u32, String), u64> = BTreeMap::new();

        for visitor in &visitors {
            let mut touches = self.events.find_all_by_visitor(owner_id, visitor).await?;
            sort_touches(&mut touches);

            let Some(cutoff) = touches.iter().find(|t| rule.matches(t)).map(|t| t.sent_at) else {
                continue;
            };

            let values = touches
                .iter()
                .filter(|t| t.sent_at < cutoff)
                .filter_map(|t| dimension.value_of(t).filter(|v| !v.is_empty()));

            for (index, value) in values.enumerate() {
                let position = index as u32 + 1;
                *counts.entry((position, value.to_string())).or_default() += 1;
            }
        }

        let mut rows: Vec<PositionAggregate> = counts
            .into_iter()
            .map(|((position, value), count)| PositionAggregate {
                value,
                position,
                count,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(b.count.cmp(&a.count))
                .then_with(|| a.value.cmp(&b.value))
        });

        debug!(
            owner_id = %owner_id,
            kpi_id = %kpi.id,
            dimension = %dimension,
            visitors = visitors.len(),
            rows = rows.len(),
            "Positional journey computed"
        );
        Ok(rows)
    }

    /// Counts converted visitors by the campaign of their earliest touch
    /// (by receipt time, across all their touches).
    ///
    /// Visitors whose earliest touch has no campaign count under "".
    /// Rows are ordered by count descending, then campaign name.
    pub async fn first_touch(&self, kpi: &Kpi) -> Result<Vec<ValueCount>> {
        self.with_deadline("first touch distribution", self.first_touch_inner(kpi))
            .await
    }

    async fn first_touch_inner(&self, kpi: &Kpi) -> Result<Vec<ValueCount>> {
        let rule = CompiledRule::compile(kpi)?;
        let owner_id = kpi.owner_id;

        let visitors = self
            .events
            .find_visitors_matching(owner_id, rule.column, &rule.value)
            .await?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for visitor in &visitors {
            if let Some(first) = self.events.find_earliest_by_visitor(owner_id, visitor).await? {
                *counts
                    .entry(first.campaign_name_or_empty().to_string())
                    .or_default() += 1;
            }
        }

        Ok(sorted_by_count(counts))
    }

    /// Conversions per UTC day (`YYYY-MM-DD`), oldest day first.
    pub async fn daily_conversions(&self, owner_id: Uuid, kpi_id: Uuid) -> Result<Vec<ValueCount>> {
        self.with_deadline("daily conversions", async {
            let conversions = self.conversions.find_by_kpi(owner_id, kpi_id).await?;

            let mut days: BTreeMap<String, u64> = BTreeMap::new();
            for conversion in &conversions {
                *days
                    .entry(conversion.created_at.format("%Y-%m-%d").to_string())
                    .or_default() += 1;
            }

            Ok(days
                .into_iter()
                .map(|(value, count)| ValueCount { value, count })
                .collect())
        })
        .await
    }

    async fn with_deadline<T, F>(&self, query: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        metrics().aggregate_queries.inc();
        let start = Instant::now();

        let result = tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| {
                metrics().aggregate_timeouts.inc();
                Error::storage(
                    DbErrorCode::DeadlineExceeded,
                    format!(
                        "{} did not finish within {}ms",
                        query,
                        self.query_timeout.as_millis()
                    ),
                )
            })?;

        metrics()
            .aggregate_latency_ms
            .observe(start.elapsed().as_millis() as u64);
        result
    }
}

/// Orders by count descending, then value ascending.
fn sorted_by_count(counts: HashMap<String, u64>) -> Vec<ValueCount> {
    let mut rows: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    rows
}
