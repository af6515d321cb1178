// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Solace metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("solace_completions_total", "Completions by outcome");
    describe_counter!(
        "solace_commit_failures_total",
        "Side-effect commit operations that failed"
    );
    describe_counter!("solace_rate_limited_total", "Requests rejected by a window");
    describe_gauge!("solace_inflight_completions", "Completions currently streaming");
    describe_histogram!(
        "solace_completion_latency_seconds",
        "Wall-clock duration of one completion"
    );
    describe_histogram!(
        "solace_first_byte_seconds",
        "Time to first upstream delta"
    );
}

/// Record one finished completion with its terminal outcome label.
pub fn record_completion(outcome: &str) {
    metrics::counter!("solace_completions_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record one failed committer operation.
pub fn record_commit_failure(operation: &str) {
    metrics::counter!("solace_commit_failures_total", "op" => operation.to_string()).increment(1);
}

/// Record one rate-limited request.
pub fn record_rate_limited(scope: &str) {
    metrics::counter!("solace_rate_limited_total", "scope" => scope.to_string()).increment(1);
}

/// Track the in-flight completion gauge.
pub fn inflight_delta(delta: f64) {
    metrics::gauge!("solace_inflight_completions").increment(delta);
}

/// Record total completion latency.
pub fn record_latency(seconds: f64) {
    metrics::histogram!("solace_completion_latency_seconds").record(seconds);
}

/// Record time to the first upstream delta.
pub fn record_first_byte(seconds: f64) {
    metrics::histogram!("solace_first_byte_seconds").record(seconds);
}
