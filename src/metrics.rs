use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing event counter.
#[derive(Debug, Default)]
pub struct Metric(AtomicU64);

impl Metric {
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-cache metrics for observability and testing.
///
/// Each cache instance has its own set, so multiple caches in one process
/// stay independently observable and tests can assert exact counts.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Lookups that found the key.
    pub hit: Metric,
    /// Lookups that missed.
    pub miss: Metric,
    /// New items appended by set.
    pub insert: Metric,
    /// Existing items overwritten by set.
    pub update: Metric,
    /// Sets rejected because the occupancy ceiling was reached.
    pub full: Metric,
    /// Items removed by del.
    pub delete: Metric,
    /// Items evicted by the sweeper.
    pub expire: Metric,
    /// Completed sweeper passes.
    pub sweep: Metric,
    /// Completed table grows.
    pub grow: Metric,
}

impl CacheMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}
