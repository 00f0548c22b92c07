//! In-app notification store.
//!
//! The CRM front end reads the notifications table; inserting a row is the
//! in-app delivery.

use domain::errors::DispatchError;
use domain::services::{NotificationSink, OutgoingNotification};
use sqlx::PgPool;
use uuid::Uuid;

use crate::metrics::QueryTimer;

/// Channel name reported in dispatch errors and logs.
pub const IN_APP_CHANNEL: &str = "in_app";

#[derive(Clone)]
pub struct InAppNotificationRepository {
    pool: PgPool,
}

impl InAppNotificationRepository {
    /// Creates a new InAppNotificationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, notification: &OutgoingNotification) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("insert_in_app_notification");
        let result: Result<(Uuid,), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO notifications (
                id, user_id, title, body, action_url, action_text, priority,
                entity_type, entity_id, rule_id, is_read, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false, NOW())
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(notification.recipient_id)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.action_url)
        .bind(&notification.action_text)
        .bind(notification.priority.as_str())
        .bind(notification.entity.entity_type.as_str())
        .bind(notification.entity.entity_id)
        .bind(notification.rule_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(|(id,)| id)
    }
}

#[async_trait::async_trait]
impl NotificationSink for InAppNotificationRepository {
    async fn send(&self, notification: &OutgoingNotification) -> Result<(), DispatchError> {
        let id = self
            .insert(notification)
            .await
            .map_err(|e| DispatchError::ChannelUnavailable {
                channel: IN_APP_CHANNEL,
                reason: e.to_string(),
            })?;

        tracing::debug!(
            notification_id = %id,
            recipient_id = %notification.recipient_id,
            entity = %notification.entity,
            "Stored in-app reminder"
        );
        Ok(())
    }
}
