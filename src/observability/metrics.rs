//! Metrics recording.
//!
//! # Metrics
//! - `endpoint_requests_total` (counter): handled requests by endpoint, status
//! - `endpoint_request_duration_seconds` (histogram): handler latency by endpoint
//! - `secret_sync_operations_total` (counter): remote secret-store calls by operation, outcome

use std::time::Instant;

pub fn record_endpoint_request(endpoint: &str, status: u16, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    ::metrics::counter!(
        "endpoint_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "endpoint_request_duration_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(elapsed);
}

/// `outcome` is `ok` or `error`, after retries.
pub fn record_sync_operation(operation: &'static str, outcome: &'static str) {
    ::metrics::counter!(
        "secret_sync_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_endpoint_request("create_orders", 200, Instant::now());
        record_sync_operation("upsert_secret", "ok");
    }
}
