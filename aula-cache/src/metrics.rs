//! Prometheus metrics for the tenant cache.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec};

/// Global metrics instance - initialized once at first use.
pub static METRICS: Lazy<Result<CacheMetrics, prometheus::Error>> = Lazy::new(CacheMetrics::new);

/// Counters for every cache operation, labelled by operation and outcome.
#[derive(Clone)]
pub struct CacheMetrics {
    pub operations_total: CounterVec,
}

impl CacheMetrics {
    fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            operations_total: register_counter_vec!(
                "aula_cache_operations_total",
                "Total number of tenant cache operations",
                &["operation", "outcome"]
            )?,
        })
    }
}

/// Record one operation outcome. Metric registration failure is logged
/// once by the caller of the cache, never propagated.
pub(crate) fn record(operation: &str, outcome: &str) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics
            .operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }
}
