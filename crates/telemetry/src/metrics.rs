//! In-process metrics, exposed as a JSON snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the attribution engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingest
    pub events_recorded: Counter,
    pub events_failed_validation: Counter,

    // Attribution
    pub conversions_recorded: Counter,
    pub conversions_deduplicated: Counter,
    pub weight_updates: Counter,
    pub weight_update_failures: Counter,
    pub configuration_errors: Counter,

    // Reporting
    pub aggregate_queries: Counter,
    pub aggregate_timeouts: Counter,

    // Latency histograms
    pub record_latency_ms: Histogram,
    pub aggregate_latency_ms: Histogram,

    // Gauges
    pub events_in_flight: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_recorded: u64,
    pub events_failed_validation: u64,
    pub conversions_recorded: u64,
    pub conversions_deduplicated: u64,
    pub weight_updates: u64,
    pub weight_update_failures: u64,
    pub configuration_errors: u64,
    pub aggregate_queries: u64,
    pub aggregate_timeouts: u64,
    pub record_latency_mean_ms: f64,
    pub record_latency_buckets: Vec<(u64, u64)>,
    pub aggregate_latency_mean_ms: f64,
    pub events_in_flight: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_recorded: self.events_recorded.get(),
            events_failed_validation: self.events_failed_validation.get(),
            conversions_recorded: self.conversions_recorded.get(),
            conversions_deduplicated: self.conversions_deduplicated.get(),
            weight_updates: self.weight_updates.get(),
            weight_update_failures: self.weight_update_failures.get(),
            configuration_errors: self.configuration_errors.get(),
            aggregate_queries: self.aggregate_queries.get(),
            aggregate_timeouts: self.aggregate_timeouts.get(),
            record_latency_mean_ms: self.record_latency_ms.mean(),
            record_latency_buckets: self.record_latency_ms.buckets(),
            aggregate_latency_mean_ms: self.aggregate_latency_ms.mean(),
            events_in_flight: self.events_in_flight.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
