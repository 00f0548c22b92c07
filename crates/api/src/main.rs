use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crm_reminders_api::app;
use crm_reminders_api::config::Config;
use crm_reminders_api::jobs::{
    JobScheduler, ReminderLogCleanupJob, ReminderScanJob, ReminderScanner,
};
use crm_reminders_api::middleware;
use persistence::repositories::{NotificationLogRepository, ReminderRuleRepository};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::init_logging(&config.logging)?;
    middleware::init_metrics();

    info!("Starting CRM reminder service v{}", env!("CARGO_PKG_VERSION"));

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    if config.reminders.seed_defaults {
        let inserted = ReminderRuleRepository::new(pool.clone())
            .seed_defaults(chrono::Utc::now())
            .await?;
        info!(inserted = inserted, "Default reminder rules seeded");
    }

    let scanner = Arc::new(ReminderScanner::new(
        app::build_orchestrator(&config, pool.clone()),
        config.scheduler.scan_timeout(),
    ));

    let mut scheduler = JobScheduler::new();
    if config.scheduler.enabled {
        scheduler.register(ReminderScanJob::new(
            Arc::clone(&scanner),
            config.scheduler.interval(),
        ));
    } else {
        warn!("Periodic reminder scan disabled; relying on the HTTP trigger");
    }
    scheduler.register(ReminderLogCleanupJob::new(
        NotificationLogRepository::new(pool.clone()),
        config.reminders.log_retention_days,
    ));
    scheduler.start();

    let app = app::create_app(config.clone(), pool, scanner);

    let addr = config.socket_addr()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler
        .wait_for_shutdown(config.scheduler.shutdown_timeout())
        .await;

    info!("CRM reminder service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
