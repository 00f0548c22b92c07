use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{ScanOrchestrator, SystemClock};
use persistence::repositories::{
    CrmEntityRepository, InAppNotificationRepository, NotificationLogRepository,
    RecipientRepository, ReminderRuleRepository, TaskRepository,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::Config;
use crate::jobs::ReminderScanner;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{health, reminders};
use crate::services::{ChannelRouter, EmailReminderSink, EmailService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub scanner: Arc<ReminderScanner>,
}

/// Wire the PostgreSQL collaborators and notification channels into an orchestrator.
pub fn build_orchestrator(config: &Config, pool: PgPool) -> ScanOrchestrator {
    let recipients = RecipientRepository::new(pool.clone());

    let mut channels = ChannelRouter::new(Arc::new(InAppNotificationRepository::new(
        pool.clone(),
    )));
    if config.email.enabled {
        channels = channels.with_email(Arc::new(EmailReminderSink::new(
            EmailService::new(config.email.clone()),
            Arc::new(recipients.clone()),
        )));
    }

    ScanOrchestrator::new(
        Arc::new(ReminderRuleRepository::new(pool.clone())),
        Arc::new(CrmEntityRepository::new(pool.clone())),
        Arc::new(recipients),
        Arc::new(NotificationLogRepository::new(pool.clone())),
        Arc::new(channels),
        Arc::new(TaskRepository::new(pool)),
        Arc::new(SystemClock),
    )
    .with_candidate_limit(config.reminders.candidate_limit)
}

pub fn create_app(config: Config, pool: PgPool, scanner: Arc<ReminderScanner>) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        pool,
        config: config.clone(),
        scanner,
    };

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Operator routes, guarded by the optional trigger token
    let internal_routes = Router::new()
        .route("/internal/reminders/run", post(reminders::run_scan))
        .route("/internal/reminders/status", get(reminders::scan_status));

    Router::new()
        .merge(public_routes)
        .merge(internal_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .with_state(state)
}
