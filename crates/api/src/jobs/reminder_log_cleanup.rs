//! Reminder notification log cleanup background job.
//!
//! Deletes ledger rows past the retention period. Rows of `fire_once` rules
//! are kept by the repository regardless of age.

use chrono::{DateTime, Duration, Utc};
use persistence::repositories::NotificationLogRepository;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

/// Shortest retention that still covers the one-day cooldown window.
const MIN_RETENTION_DAYS: u32 = 2;

/// Background job to clean up old reminder notification logs.
pub struct ReminderLogCleanupJob {
    logs: NotificationLogRepository,
    retention_days: u32,
}

impl ReminderLogCleanupJob {
    pub fn new(logs: NotificationLogRepository, retention_days: u32) -> Self {
        Self {
            logs,
            retention_days: retention_days.max(MIN_RETENTION_DAYS),
        }
    }
}

/// Rows logged before this instant are eligible for deletion.
fn retention_cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(retention_days.max(MIN_RETENTION_DAYS)))
}

#[async_trait::async_trait]
impl Job for ReminderLogCleanupJob {
    fn name(&self) -> &'static str {
        "reminder_log_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), String> {
        let cutoff = retention_cutoff(Utc::now(), self.retention_days);

        let deleted = self
            .logs
            .delete_older_than(cutoff)
            .await
            .map_err(|e| format!("Failed to clean up reminder notification logs: {}", e))?;

        info!(
            deleted = deleted,
            retention_days = self.retention_days,
            cutoff = %cutoff,
            "Cleaned up old reminder notification logs"
        );

        Ok(())
    }
}
