//! Metrics collection.
//!
//! # Metrics
//! - `api_attempts_total` (counter): transport attempts by method, outcome
//! - `api_attempt_duration_ms` (histogram): per-attempt latency
//! - `api_retries_total` (counter): retry decisions by method
//! - `api_dedup_hits_total` (counter): callers attached to an in-flight call
//! - `api_cache_lookups_total` (counter): soft cache lookups by result
//! - `api_telemetry_dropped_total` (counter): telemetry events lost
//!
//! # Design Decisions
//! - The library records through the `metrics` facade only; installing an
//!   exporter is left to the embedding application

use metrics::{counter, histogram};

/// Record one transport attempt.
pub fn record_attempt(method: &str, outcome: &'static str, latency_ms: f64) {
    counter!("api_attempts_total", "method" => method.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("api_attempt_duration_ms", "method" => method.to_string()).record(latency_ms);
}

/// Record a retry decision.
pub fn record_retry(method: &str) {
    counter!("api_retries_total", "method" => method.to_string()).increment(1);
}

/// Record a caller attaching to an in-flight request.
pub fn record_dedup_hit() {
    counter!("api_dedup_hits_total").increment(1);
}

/// Record a soft cache lookup.
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("api_cache_lookups_total", "result" => result).increment(1);
}

/// Record a telemetry event that never reached the sink.
pub fn record_telemetry_dropped(reason: &'static str) {
    counter!("api_telemetry_dropped_total", "reason" => reason).increment(1);
}
