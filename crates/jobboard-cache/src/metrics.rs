//! Prometheus metrics for cache monitoring.

use crate::availability::ConnectionState;
use metrics::{counter, describe_counter, describe_gauge, gauge};

/// Metric names for the cache layer.
pub mod names {
    /// Reads served from the cache.
    pub const CACHE_HITS_TOTAL: &str = "jobboard_cache_hits_total";
    /// Reads that found no usable entry.
    pub const CACHE_MISSES_TOTAL: &str = "jobboard_cache_misses_total";
    /// Source-of-truth computations triggered by the cache layer.
    pub const CACHE_COMPUTES_TOTAL: &str = "jobboard_cache_computes_total";
    /// Reads that skipped the cache because the backend was unavailable.
    pub const CACHE_BYPASS_TOTAL: &str = "jobboard_cache_bypass_total";
    /// Best-effort writes that did not land.
    pub const CACHE_SET_FAILURES_TOTAL: &str = "jobboard_cache_set_failures_total";
    /// Stored values that could not be decoded.
    pub const CACHE_DECODE_FAILURES_TOTAL: &str = "jobboard_cache_decode_failures_total";
    /// Namespace invalidations, labelled by outcome.
    pub const CACHE_INVALIDATIONS_TOTAL: &str = "jobboard_cache_invalidations_total";
    /// Backend connection state transitions.
    pub const CACHE_STATE_TRANSITIONS_TOTAL: &str = "jobboard_cache_state_transitions_total";
    /// Current backend connection state (0 connecting, 1 ready, 2 error).
    pub const CACHE_CONNECTION_STATE: &str = "jobboard_cache_connection_state";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Total number of cache misses");
    describe_counter!(
        names::CACHE_COMPUTES_TOTAL,
        "Total number of source-of-truth computations"
    );
    describe_counter!(
        names::CACHE_BYPASS_TOTAL,
        "Total number of reads that bypassed an unavailable cache"
    );
    describe_counter!(
        names::CACHE_SET_FAILURES_TOTAL,
        "Total number of cache writes that failed"
    );
    describe_counter!(
        names::CACHE_DECODE_FAILURES_TOTAL,
        "Total number of cached values that failed to decode"
    );
    describe_counter!(
        names::CACHE_INVALIDATIONS_TOTAL,
        "Total number of namespace invalidations"
    );
    describe_counter!(
        names::CACHE_STATE_TRANSITIONS_TOTAL,
        "Total number of cache connection state transitions"
    );
    describe_gauge!(
        names::CACHE_CONNECTION_STATE,
        "Current cache connection state (0 connecting, 1 ready, 2 error)"
    );
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a cache hit.
    pub fn hit(namespace: &str) {
        counter!(names::CACHE_HITS_TOTAL, "namespace" => namespace.to_string()).increment(1);
    }

    /// Record a cache miss.
    pub fn miss(namespace: &str) {
        counter!(names::CACHE_MISSES_TOTAL, "namespace" => namespace.to_string()).increment(1);
    }

    /// Record a source-of-truth computation.
    pub fn computed(namespace: &str) {
        counter!(names::CACHE_COMPUTES_TOTAL, "namespace" => namespace.to_string()).increment(1);
    }

    /// Record a read that went straight to the source of truth.
    pub fn bypass(namespace: &str) {
        counter!(names::CACHE_BYPASS_TOTAL, "namespace" => namespace.to_string()).increment(1);
    }

    /// Record a failed write.
    pub fn set_failed(namespace: &str) {
        counter!(names::CACHE_SET_FAILURES_TOTAL, "namespace" => namespace.to_string())
            .increment(1);
    }

    /// Record an undecodable entry.
    pub fn decode_failed(namespace: &str) {
        counter!(names::CACHE_DECODE_FAILURES_TOTAL, "namespace" => namespace.to_string())
            .increment(1);
    }

    /// Record a namespace invalidation.
    pub fn invalidated(namespace: &str, outcome: &'static str) {
        counter!(
            names::CACHE_INVALIDATIONS_TOTAL,
            "namespace" => namespace.to_string(),
            "outcome" => outcome
        )
        .increment(1);
    }

    /// Record a connection state change.
    pub fn state_changed(to: ConnectionState) {
        counter!(names::CACHE_STATE_TRANSITIONS_TOTAL, "to" => to.as_str()).increment(1);
        gauge!(names::CACHE_CONNECTION_STATE).set(f64::from(to as u8));
    }
}

/// Extracts the namespace label from a cache key.
pub(crate) fn namespace_of(key: &str) -> &str {
    key.split_once(':').map_or(key, |(namespace, _)| namespace)
}
