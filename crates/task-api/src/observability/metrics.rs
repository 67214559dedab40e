//! Metrics definitions for the Task API.
//!
//! All metrics follow Prometheus naming conventions:
//! - `task_api_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP verbs
//! - `endpoint`: normalized paths (route groups collapse to one label each)
//! - `reason`: fixed set of gate rejection reasons
//! - `status`: success / error / timeout

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used by `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // HTTP request buckets aligned with a 200ms p95 target
        .set_buckets_for_metric(
            Matcher::Prefix("task_api_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Login is dominated by bcrypt (~200ms at cost 12)
        .set_buckets_for_metric(
            Matcher::Prefix("task_api_login".to_string()),
            &[0.050, 0.100, 0.200, 0.300, 0.500, 0.750, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set login buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `task_api_http_requests_total`, `task_api_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("task_api_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("task_api_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Collapse a request path to a bounded label.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/auth/register" => "/api/auth/register",
        "/api/auth/login" => "/api/auth/login",
        "/api/auth/logout" => "/api/auth/logout",
        "/api/auth/verify" => "/api/auth/verify",
        p if p.starts_with("/api/admin/") => "/api/admin/*",
        p if p.starts_with("/api/manager/") => "/api/manager/*",
        p if p.starts_with("/api/staff/") => "/api/staff/*",
        p if p.starts_with("/api/attachments/") => "/api/attachments/*",
        _ => "/other",
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record a request rejected by the authentication or role gate.
///
/// Metric: `task_api_auth_rejections_total`
/// Labels: `reason` (missing, malformed_header, revoked, invalid, expired,
/// bad_subject, bad_role, no_identity, forbidden)
pub fn record_auth_rejection(reason: &'static str) {
    counter!("task_api_auth_rejections_total", "reason" => reason).increment(1);
}

/// Record a login attempt.
///
/// Metric: `task_api_login_duration_seconds`, `task_api_logins_total`
/// Labels: `status` (success, error)
pub fn record_login(status: &'static str, duration: Duration) {
    histogram!("task_api_login_duration_seconds").record(duration.as_secs_f64());
    counter!("task_api_logins_total", "status" => status).increment(1);
}

/// Record a freshly issued token.
///
/// Metric: `task_api_tokens_issued_total`
pub fn record_token_issued() {
    counter!("task_api_tokens_issued_total").increment(1);
}

// ============================================================================
// Revocation Metrics
// ============================================================================

/// Record a logout that revoked a token.
///
/// Metric: `task_api_revocations_total`
pub fn record_revocation() {
    counter!("task_api_revocations_total").increment(1);
}

/// Current number of entries held by the revocation registry.
///
/// Metric: `task_api_revoked_tokens`
pub fn set_revoked_tokens(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("task_api_revoked_tokens").set(count as f64);
}

/// Record one sweep of the revocation registry.
///
/// Metric: `task_api_revocation_sweeps_total`, `task_api_revocation_swept_total`
pub fn record_revocation_sweep(removed: usize) {
    counter!("task_api_revocation_sweeps_total").increment(1);
    counter!("task_api_revocation_swept_total").increment(removed as u64);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use std::collections::HashMap;

    /// Counters and gauges from a single snapshot, keyed by metric name.
    fn snapshot_values(snapshotter: &Snapshotter) -> (HashMap<String, u64>, HashMap<String, f64>) {
        let mut counters = HashMap::new();
        let mut gauges = HashMap::new();
        for (key, _, _, value) in snapshotter.snapshot().into_vec() {
            let name = key.key().name().to_string();
            match value {
                DebugValue::Counter(v) => {
                    counters.insert(name, v);
                }
                DebugValue::Gauge(v) => {
                    gauges.insert(name, v.into_inner());
                }
                DebugValue::Histogram(_) => {}
            }
        }
        (counters, gauges)
    }

    #[test]
    fn test_normalize_known_paths() {
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/api/auth/login"), "/api/auth/login");
        assert_eq!(normalize_endpoint("/api/auth/verify"), "/api/auth/verify");
    }

    #[test]
    fn test_normalize_route_groups() {
        assert_eq!(normalize_endpoint("/api/admin/users/42"), "/api/admin/*");
        assert_eq!(normalize_endpoint("/api/staff/tasks"), "/api/staff/*");
        assert_eq!(
            normalize_endpoint("/api/attachments/9f2c/download"),
            "/api/attachments/*"
        );
    }

    #[test]
    fn test_normalize_unknown_paths() {
        assert_eq!(normalize_endpoint("/"), "/other");
        assert_eq!(normalize_endpoint("/api/adminx"), "/other");
        assert_eq!(normalize_endpoint("/wp-login.php"), "/other");
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(201), "success");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(403), "error");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
    }

    #[test]
    fn test_revocation_metrics_are_recorded() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_revocation();
            record_revocation();
            record_revocation_sweep(3);
            set_revoked_tokens(5);
        });

        let (counters, gauges) = snapshot_values(&snapshotter);
        assert_eq!(counters.get("task_api_revocations_total"), Some(&2));
        assert_eq!(counters.get("task_api_revocation_sweeps_total"), Some(&1));
        assert_eq!(counters.get("task_api_revocation_swept_total"), Some(&3));
        assert_eq!(gauges.get("task_api_revoked_tokens"), Some(&5.0));
    }

    #[test]
    fn test_auth_rejection_labelled_by_reason() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_auth_rejection("revoked");
            record_auth_rejection("forbidden");
        });

        let snapshot = snapshotter.snapshot().into_vec();
        let reasons: Vec<String> = snapshot
            .iter()
            .filter(|(key, _, _, _)| key.key().name() == "task_api_auth_rejections_total")
            .flat_map(|(key, _, _, _)| {
                key.key()
                    .labels()
                    .map(|l| l.value().to_string())
                    .collect::<Vec<_>>()
            })
            .collect();

        assert!(reasons.contains(&"revoked".to_string()));
        assert!(reasons.contains(&"forbidden".to_string()));
    }

    #[test]
    fn test_http_metrics_do_not_panic_without_recorder() {
        record_http_request("GET", "/api/staff/tasks", 200, Duration::from_millis(5));
        record_login("success", Duration::from_millis(200));
        record_token_issued();
    }
}
