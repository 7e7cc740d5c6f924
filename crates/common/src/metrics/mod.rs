//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Aqar metrics
pub const METRICS_PREFIX: &str = "aqar";

/// Histogram buckets for request latency (in seconds).
/// Two completion calls sit on the hot path, so the tail is long.
pub const LATENCY_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    3.000,  // 3s - P50 target
    5.000,  // 5s
    8.000,  // 8s - P99 target
    12.00,  // 12s
    20.00,  // 20s
    30.00,  // 30s
    60.00,  // 60s
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

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search invocations"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end search latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of candidates returned from the last search"
    );

    describe_counter!(
        format!("{}_filter_fallback_total", METRICS_PREFIX),
        Unit::Count,
        "Filter extractions that fell back to unfiltered defaults"
    );

    describe_counter!(
        format!("{}_invalid_citations_total", METRICS_PREFIX),
        Unit::Count,
        "Citation markers in answers that point outside the context"
    );

    // Completion metrics
    describe_counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total completion service requests"
    );

    describe_histogram!(
        format!("{}_completion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Completion service latency in seconds"
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

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, language: &str, outcome: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "language" => language.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "language" => language.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "language" => language.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record completion service metrics
pub fn record_completion(duration_secs: f64, stage: &str, provider: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_completion_requests_total", METRICS_PREFIX),
        "stage" => stage.to_string(),
        "provider" => provider.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_completion_duration_seconds", METRICS_PREFIX),
            "stage" => stage.to_string()
        )
        .record(duration_secs);
    }
}

/// Count a filter extraction that degraded to defaults
pub fn record_filter_fallback(reason: &str) {
    counter!(
        format!("{}_filter_fallback_total", METRICS_PREFIX),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Count citation markers that do not resolve to a context entry
pub fn record_invalid_citations(count: usize) {
    counter!(format!("{}_invalid_citations_total", METRICS_PREFIX)).increment(count as u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        assert!(LATENCY_BUCKETS.contains(&3.000));
        assert!(LATENCY_BUCKETS.contains(&8.000));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: every helper must be a no-op
        let metrics = RequestMetrics::start("POST", "/v1/search");
        metrics.finish(200);
        record_search(0.42, "en", "success", 3);
        record_completion(0.1, "extraction", "mock", true);
        record_filter_fallback("malformed_json");
        record_invalid_citations(2);
    }
}
