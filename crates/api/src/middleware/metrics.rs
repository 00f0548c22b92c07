//! Prometheus metrics middleware.
//!
//! Provides HTTP request/response metrics collection, reminder scan
//! counters, and the Prometheus export handler.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::ScanReport;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Middleware to record HTTP request metrics.
///
/// Records the following metrics:
/// - `http_requests_total`: Counter with labels (method, path, status)
/// - `http_request_duration_seconds`: Histogram with labels (method, path)
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    let method_str = method_to_str(&method);

    counter!(
        "http_requests_total",
        "method" => method_str,
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method_str,
        "path" => path
    )
    .record(duration);

    response
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// Outcome label of `reminder_scans_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    Failed,
    TimedOut,
    Busy,
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Completed => "completed",
            ScanOutcome::Failed => "failed",
            ScanOutcome::TimedOut => "timed_out",
            ScanOutcome::Busy => "busy",
        }
    }
}

/// Record the outcome and duration of one scan attempt.
pub fn record_scan(outcome: ScanOutcome, elapsed: Duration) {
    counter!("reminder_scans_total", "outcome" => outcome.as_str()).increment(1);
    if outcome != ScanOutcome::Busy {
        histogram!("reminder_scan_duration_seconds").record(elapsed.as_secs_f64());
    }
}

/// Record the delivery counters of a completed scan.
pub fn record_scan_report(report: &ScanReport) {
    counter!("reminder_notifications_total", "status" => "sent")
        .increment(u64::from(report.notifications_sent));
    counter!("reminder_notifications_total", "status" => "failed")
        .increment(u64::from(report.notifications_failed));
    counter!("reminder_notifications_total", "status" => "suppressed")
        .increment(u64::from(report.notifications_suppressed));
    counter!("reminder_tasks_created_total").increment(u64::from(report.tasks_created));
}

/// Handler for /metrics endpoint that returns Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
    } else {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        )
    }
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Installs the global recorder on first call; later calls are no-ops.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&[
            0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 30.0, 120.0,
        ])
        .and_then(|builder| builder.install_recorder());

    match handle {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Prometheus recorder not installed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_to_str() {
        assert_eq!(method_to_str(&Method::GET), "GET");
        assert_eq!(method_to_str(&Method::POST), "POST");
        assert_eq!(method_to_str(&Method::DELETE), "DELETE");
        assert_eq!(method_to_str(&Method::TRACE), "OTHER");
    }

    #[test]
    fn test_scan_outcome_labels() {
        assert_eq!(ScanOutcome::Completed.as_str(), "completed");
        assert_eq!(ScanOutcome::TimedOut.as_str(), "timed_out");
        assert_eq!(ScanOutcome::Busy.as_str(), "busy");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_scan(ScanOutcome::Failed, Duration::from_millis(5));
        record_scan_report(&ScanReport {
            notifications_sent: 3,
            ..ScanReport::default()
        });
    }
}
