//! Metrics definitions for the authorization service
//!
//! All metrics follow Prometheus naming conventions:
//! - `authz_` prefix for the authorization service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: 2 values (authorized, denied)
//! - `reason`: bounded by the error taxonomy (~7 values)
//! - `status`: 2 values (success, error)
//! - `cache_status`: 3 values (hit, miss, refresh)
//! - `path`: bounded by `normalize_path`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded; installing twice in
/// one process fails.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed (e.g., already
/// installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Authorization checks are local CPU work plus at most one
        // discovery fetch; sub-second buckets with a long tail.
        .set_buckets_for_metric(
            Matcher::Prefix("authz_check".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set check buckets: {e}"))?
        // Discovery fetches cross the network and carry a 10s default
        // timeout.
        .set_buckets_for_metric(
            Matcher::Prefix("authz_keyset_fetch".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set fetch buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("authz_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Authorization Metrics
// ============================================================================

/// Record a completed authorization check
///
/// Metric: `authz_checks_total`, `authz_check_duration_seconds`
/// Labels: `outcome` (authorized, denied)
pub fn record_authorization(outcome: &str, duration: Duration) {
    histogram!("authz_check_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());

    counter!("authz_checks_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a denial by internal reason
///
/// Metric: `authz_denials_total`
/// Labels: `reason` (keyset_unavailable, malformed_token, key_not_found,
/// invalid_signature, token_expired, invalid_claim, unauthorized)
///
/// The reason label is internal-only; the wire response never carries it.
pub fn record_denial(reason: &str) {
    counter!("authz_denials_total", "reason" => reason.to_string()).increment(1);
}

// ============================================================================
// Key Set Metrics
// ============================================================================

/// Record a key-set discovery fetch
///
/// Metric: `authz_keyset_fetch_total`, `authz_keyset_fetch_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_keyset_fetch(status: &str, duration: Duration) {
    histogram!("authz_keyset_fetch_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("authz_keyset_fetch_total", "status" => status.to_string()).increment(1);
}

/// Record a key-set cache lookup
///
/// Metric: `authz_keyset_requests_total`
/// Labels: `cache_status` (hit, miss, refresh)
pub fn record_keyset_cache(cache_status: &str) {
    counter!("authz_keyset_requests_total", "cache_status" => cache_status.to_string())
        .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `authz_http_requests_total`, `authz_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
///
/// This captures ALL HTTP responses including framework-level errors like:
/// - 415 Unsupported Media Type (wrong Content-Type)
/// - 400 Bad Request (JSON parse errors)
/// - 404 Not Found
/// - 405 Method Not Allowed
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    // Normalize path to prevent cardinality explosion
    let normalized_path = normalize_path(path);

    histogram!("authz_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("authz_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Normalize path to prevent label cardinality explosion
///
/// The route surface is small and static; anything else collapses to
/// a generic label.
fn normalize_path(path: &str) -> String {
    match path {
        "/" => "/".to_string(),
        "/health" => "/health".to_string(),
        "/metrics" => "/metrics".to_string(),
        "/v1/authorize" => "/v1/authorize".to_string(),
        _ => "/other".to_string(),
    }
}
