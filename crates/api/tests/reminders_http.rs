//! HTTP surface tests against an in-memory backed scanner.

mod common;

use axum::http::StatusCode;
use domain::errors::RepositoryError;
use domain::models::{DeliveryStatus, ReminderRule};
use domain::services::RuleRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use common::*;

/// Rule source that blocks until released.
struct GatedRules {
    entered: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl RuleRepository for GatedRules {
    async fn list_active(&self) -> Result<Vec<ReminderRule>, RepositoryError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Vec::new())
    }
}

/// Rule source slower than any test timeout.
struct StalledRules;

#[async_trait::async_trait]
impl RuleRepository for StalledRules {
    async fn list_active(&self) -> Result<Vec<ReminderRule>, RepositoryError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_live_endpoint() {
    let backend = TestBackend::new(Vec::new());
    let scanner = Arc::new(backend.scanner(default_rule_source(), Duration::from_secs(5)));
    let app = app(test_config(&[]), scanner);

    let response = send(&app, get("/health/live")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "alive");
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let backend = TestBackend::new(Vec::new());
    let scanner = Arc::new(backend.scanner(default_rule_source(), Duration::from_secs(5)));
    let app = app(test_config(&[]), scanner);

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["database"]["connected"], false);
    assert_eq!(body["scanner"]["running"], false);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let backend = TestBackend::new(Vec::new());
    let scanner = Arc::new(backend.scanner(default_rule_source(), Duration::from_secs(5)));
    let app = app(test_config(&[]), scanner);

    let request = axum::http::Request::builder()
        .uri("/health/live")
        .header("x-request-id", "cron-7")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.headers()["x-request-id"], "cron-7");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    crm_reminders_api::middleware::init_metrics();

    let backend = TestBackend::new(vec![task_due_tomorrow(Uuid::new_v4())]);
    let scanner = Arc::new(backend.scanner(default_rule_source(), Duration::from_secs(5)));
    let app = app(test_config(&[]), scanner);

    let response = send(&app, post("/internal/reminders/run", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("reminder_scans_total"));
}

#[tokio::test]
async fn test_trigger_runs_scan_and_deduplicates() {
    let assignee = Uuid::new_v4();
    let backend = TestBackend::new(vec![task_due_tomorrow(assignee)]);
    let scanner = Arc::new(backend.scanner(default_rule_source(), Duration::from_secs(5)));
    let app = app(test_config(&[]), scanner);

    let response = send(&app, post("/internal/reminders/run", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["notifications_sent"], 1);
    assert_eq!(report["previous_completed_at"], serde_json::Value::Null);

    let sent = backend.sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient_id, assignee);
    assert_eq!(sent[0].body, "Task 'Fix printer' is due in 1 days.");

    let response = send(&app, post("/internal/reminders/run", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["notifications_sent"], 0);
    assert_eq!(report["notifications_suppressed"], 1);
    assert_ne!(report["previous_completed_at"], serde_json::Value::Null);

    assert_eq!(
        backend.ledger.entries_with_status(DeliveryStatus::Sent).len(),
        1
    );
    assert_eq!(backend.sink.sent().len(), 1);
}

#[tokio::test]
async fn test_trigger_requires_configured_token() {
    let backend = TestBackend::new(vec![task_due_tomorrow(Uuid::new_v4())]);
    let scanner = Arc::new(backend.scanner(default_rule_source(), Duration::from_secs(5)));
    let app = app(
        test_config(&[("scheduler.trigger_token", "cron-secret")]),
        scanner,
    );

    let response = send(&app, post("/internal/reminders/run", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, post("/internal/reminders/run", Some("guess"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");
    assert!(backend.sink.sent().is_empty());

    let response = send(&app, post("/internal/reminders/run", Some("cron-secret"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(backend.sink.sent().len(), 1);
}

#[tokio::test]
async fn test_trigger_conflicts_while_scan_in_flight() {
    let gate = Arc::new(GatedRules {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let backend = TestBackend::new(Vec::new());
    let scanner = Arc::new(backend.scanner(gate.clone(), Duration::from_secs(5)));
    let app = app(test_config(&[]), Arc::clone(&scanner));

    let in_flight = tokio::spawn({
        let scanner = Arc::clone(&scanner);
        async move { scanner.run().await }
    });
    gate.entered.notified().await;

    let response = send(&app, post("/internal/reminders/run", None)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, get("/internal/reminders/status")).await;
    assert_eq!(body_json(response).await["running"], true);

    gate.release.notify_one();
    assert!(in_flight.await.unwrap().is_ok());

    let response = send(&app, get("/internal/reminders/status")).await;
    let status = body_json(response).await;
    assert_eq!(status["running"], false);
    assert_ne!(status["last_completed_at"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_trigger_times_out() {
    let backend = TestBackend::new(Vec::new());
    let scanner = Arc::new(backend.scanner(Arc::new(StalledRules), Duration::from_millis(50)));
    let app = app(test_config(&[]), Arc::clone(&scanner));

    let response = send(&app, post("/internal/reminders/run", None)).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(scanner.last_completed_at(), None);
}

#[tokio::test]
async fn test_trigger_reports_infrastructure_failure() {
    let rules = default_rule_source();
    rules.set_unavailable(true);
    let backend = TestBackend::new(vec![task_due_tomorrow(Uuid::new_v4())]);
    let scanner = Arc::new(backend.scanner(rules, Duration::from_secs(5)));
    let app = app(test_config(&[]), scanner);

    let response = send(&app, post("/internal/reminders/run", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "service_unavailable");
    assert!(backend.sink.sent().is_empty());
}
