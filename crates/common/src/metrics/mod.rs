//! Metrics and observability utilities
//!
//! Provides metrics-rs registration with generator-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Metrics prefix for all AnswerForge metrics
pub const METRICS_PREFIX: &str = "answerforge";

/// Histogram buckets for generator round trips (in seconds)
pub const GENERATOR_BUCKETS: &[f64] = &[
    0.100, // 100ms
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.000, // 2s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
];

/// Histogram buckets for whole answering runs (in seconds).
/// Refine runs one round trip per fragment, so the tail is long.
pub const RUN_BUCKETS: &[f64] = &[
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
    30.00, // 30s
    60.00, // 60s
    120.0, // 2m
    300.0, // 5m
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Run metrics
    describe_counter!(
        format!("{}_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total answering runs"
    );

    describe_histogram!(
        format!("{}_run_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Answering run latency in seconds"
    );

    describe_counter!(
        format!("{}_run_fragments_total", METRICS_PREFIX),
        Unit::Count,
        "Total fragments consumed by answering runs"
    );

    // Generator metrics
    describe_counter!(
        format!("{}_generator_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total generator API requests"
    );

    describe_histogram!(
        format!("{}_generator_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generator round trip latency in seconds"
    );

    describe_counter!(
        format!("{}_generator_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total generator API errors"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record a completed answering run
pub fn record_run(strategy: &str, duration_secs: f64, fragment_count: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_runs_total", METRICS_PREFIX),
        "strategy" => strategy.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_run_fragments_total", METRICS_PREFIX),
        "strategy" => strategy.to_string()
    )
    .increment(fragment_count as u64);

    if success {
        histogram!(
            format!("{}_run_duration_seconds", METRICS_PREFIX),
            "strategy" => strategy.to_string()
        )
        .record(duration_secs);
    }
}

/// Helper to record a generator round trip
pub fn record_generator_call(model: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generator_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_generator_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_generator_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_sorted() {
        for buckets in [GENERATOR_BUCKETS, RUN_BUCKETS] {
            let mut prev = 0.0;
            for &bucket in buckets {
                assert!(bucket > prev);
                prev = bucket;
            }
        }
    }

    #[test]
    fn test_record_helpers() {
        record_run("stuff", 0.5, 4, true);
        record_generator_call("mock-generator", 0.1, false);
        // Just verify they run without panic
    }
}
