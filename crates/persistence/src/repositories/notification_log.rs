//! Reminder notification log repository.
//!
//! Append-only ledger of firing attempts. Only `sent` rows take part in
//! deduplication; `failed` rows are kept for inspection and retried on the
//! next scan.

use chrono::{DateTime, Utc};
use domain::errors::RepositoryError;
use domain::models::{LedgerKey, NotificationLogEntry};
use domain::services::NotificationLedger;
use sqlx::PgPool;

use crate::metrics::QueryTimer;
use crate::repositories::map_db_error;

/// Repository for the reminder notification ledger.
#[derive(Clone)]
pub struct NotificationLogRepository {
    pool: PgPool,
}

impl NotificationLogRepository {
    /// Creates a new NotificationLogRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether a `sent` row exists for the key at or after `since`.
    pub async fn exists_sent_since(
        &self,
        key: &LedgerKey,
        since: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("reminder_log_exists_sent_since");
        let result: Result<(bool,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reminder_notification_logs
                WHERE rule_id = $1
                  AND entity_type = $2
                  AND entity_id = $3
                  AND recipient_id = $4
                  AND status = 'sent'
                  AND sent_at >= $5
            )
            "#,
        )
        .bind(key.rule_id)
        .bind(key.entity_type.as_str())
        .bind(key.entity_id)
        .bind(key.recipient_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(|(exists,)| exists)
    }

    /// Append one entry.
    pub async fn insert(&self, entry: &NotificationLogEntry) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_reminder_log");
        let result = sqlx::query(
            r#"
            INSERT INTO reminder_notification_logs (
                id, rule_id, entity_type, entity_id, recipient_id,
                notification_type, status, error_message, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.rule_id)
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(entry.recipient_id)
        .bind(entry.notification_type.as_str())
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .bind(entry.sent_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Delete rows older than `cutoff`. Returns the number of rows removed.
    ///
    /// Rows of `fire_once` rules are kept regardless of age, otherwise the
    /// rule would fire again once its history is purged.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_old_reminder_logs");
        let result = sqlx::query(
            r#"
            DELETE FROM reminder_notification_logs l
            WHERE l.sent_at < $1
              AND NOT EXISTS (
                  SELECT 1 FROM reminder_rules r
                  WHERE r.id = l.rule_id AND r.fire_once = true
              )
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }
}

#[async_trait::async_trait]
impl NotificationLedger for NotificationLogRepository {
    async fn was_recently_notified(
        &self,
        key: &LedgerKey,
        since: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.exists_sent_since(key, since).await.map_err(map_db_error)
    }

    async fn record(&self, entry: &NotificationLogEntry) -> Result<(), RepositoryError> {
        self.insert(entry).await.map_err(map_db_error)
    }
}
