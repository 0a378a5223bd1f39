//! Metrics and observability utilities
//!
//! Provides Prometheus metrics for the relation cache pipeline
//! with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all CiteGraph metrics
pub const METRICS_PREFIX: &str = "citegraph";

/// Buckets for bibliographic API latency (bounded by the 10s client timeout)
pub const UPSTREAM_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s - client timeout
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Bibliographic API metrics
    describe_counter!(
        format!("{}_upstream_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Bibliographic API requests by operation and outcome"
    );

    describe_histogram!(
        format!("{}_upstream_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Bibliographic API latency in seconds"
    );

    describe_counter!(
        format!("{}_upstream_entries_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Related-paper entries dropped as malformed"
    );

    // Relation cache metrics
    describe_counter!(
        format!("{}_cache_hits_total", METRICS_PREFIX),
        Unit::Count,
        "Relation lookups answered from the cache"
    );

    describe_counter!(
        format!("{}_cache_misses_total", METRICS_PREFIX),
        Unit::Count,
        "Relation lookups that required an upstream fetch"
    );

    describe_counter!(
        format!("{}_relations_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Relation records inserted into the cache"
    );

    describe_counter!(
        format!("{}_relations_evicted_total", METRICS_PREFIX),
        Unit::Count,
        "Relation records evicted to stay within capacity"
    );

    // Graph metrics
    describe_counter!(
        format!("{}_graphs_built_total", METRICS_PREFIX),
        Unit::Count,
        "Citation graphs assembled"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record one bibliographic API call (`operation` is "resolve" or "fetch")
pub fn record_upstream(operation: &str, outcome: &str, duration_secs: f64) {
    counter!(
        format!("{}_upstream_requests_total", METRICS_PREFIX),
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_upstream_duration_seconds", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Record entries skipped while parsing a detail payload
pub fn record_skipped_entries(count: usize) {
    if count == 0 {
        return;
    }
    counter!(format!("{}_upstream_entries_skipped_total", METRICS_PREFIX))
        .increment(count as u64);
}

/// Helper to record cache metrics
pub fn record_cache(hit: bool) {
    if hit {
        counter!(format!("{}_cache_hits_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_cache_misses_total", METRICS_PREFIX)).increment(1);
    }
}

/// Record one stored relation and the records evicted to make room
pub fn record_insert(relation_type: &str, evicted: usize) {
    counter!(
        format!("{}_relations_ingested_total", METRICS_PREFIX),
        "relation_type" => relation_type.to_string()
    )
    .increment(1);

    if evicted > 0 {
        counter!(
            format!("{}_relations_evicted_total", METRICS_PREFIX),
            "relation_type" => relation_type.to_string()
        )
        .increment(evicted as u64);
    }
}

/// Record a citation graph build
pub fn record_graph(node_count: usize) {
    counter!(format!("{}_graphs_built_total", METRICS_PREFIX)).increment(1);
    tracing::debug!(node_count, "Graph metrics recorded");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_buckets() {
        // Buckets are sorted and end at the client timeout
        let mut prev = 0.0;
        for &bucket in UPSTREAM_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
        assert_eq!(UPSTREAM_BUCKETS.last(), Some(&10.0));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: every helper is a no-op
        let metrics = RequestMetrics::start("GET", "/v1/papers/x/citation-graph");
        metrics.finish(200);
        record_upstream("fetch", "success", 0.2);
        record_skipped_entries(3);
        record_cache(true);
        record_insert("REFERENCES", 1);
        record_graph(6);
    }
}
