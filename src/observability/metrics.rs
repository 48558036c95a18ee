//! Metrics collection.
//!
//! # Metrics
//! - `feedback_rate_limited_total` (counter): rejected requests by action
//! - `feedback_csrf_rejected_total` (counter): token verification failures
//! - `feedback_fetch_total` (counter): outbound fetches by outcome
//! - `feedback_store_errors_total` (counter): bucket store failures
//!
//! No exporter is installed here; without a recorder these are no-ops.

use metrics::counter;

/// Record a request rejected by the rate limiter.
pub fn record_rate_limited(action: &str) {
    counter!("feedback_rate_limited_total", "action" => action.to_string()).increment(1);
}

/// Record a failed CSRF verification.
pub fn record_csrf_rejected() {
    counter!("feedback_csrf_rejected_total").increment(1);
}

/// Record the outcome of an outbound fetch.
pub fn record_fetch(outcome: &'static str) {
    counter!("feedback_fetch_total", "outcome" => outcome).increment(1);
}

/// Record a bucket store failure.
pub fn record_store_error() {
    counter!("feedback_store_errors_total").increment(1);
}
