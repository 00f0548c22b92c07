//! Notification sink abstraction.
//!
//! The engine hands fully rendered notifications to a [`NotificationSink`];
//! transports (in-app store, email) live behind it.

use serde::{Deserialize, Serialize};
use shared::template::{render, TemplateContext};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::errors::DispatchError;
use crate::models::{EntityRef, NotificationType, Priority, ReminderRule};

/// A rendered reminder addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutgoingNotification {
    pub rule_id: Uuid,
    pub notification_type: NotificationType,
    pub recipient_id: Uuid,
    pub entity: EntityRef,
    pub title: String,
    pub body: String,
    pub action_url: String,
    pub action_text: String,
    pub priority: Priority,
}

impl OutgoingNotification {
    /// Render the rule's four message templates for one recipient.
    pub fn render(
        rule: &ReminderRule,
        entity: EntityRef,
        recipient_id: Uuid,
        context: &TemplateContext,
    ) -> Self {
        Self {
            rule_id: rule.id,
            notification_type: rule.notification_type,
            recipient_id,
            entity,
            title: render(&rule.title_template, context),
            body: render(&rule.body_template, context),
            action_url: render(&rule.action_url_template, context),
            action_text: render(&rule.action_text_template, context),
            priority: rule.priority,
        }
    }
}

/// Delivers rendered notifications.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &OutgoingNotification) -> Result<(), DispatchError>;
}

/// Mock sink for development and testing.
///
/// Records every notification it accepts instead of delivering it.
#[derive(Debug, Default)]
pub struct MockNotificationSink {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    /// Recipients for which delivery fails even when `simulate_failure` is off.
    pub failing_recipients: Vec<Uuid>,
    sent: Mutex<Vec<OutgoingNotification>>,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock sink that fails every delivery.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Create a mock sink that fails for the given recipients only.
    pub fn failing_for(recipients: Vec<Uuid>) -> Self {
        Self {
            failing_recipients: recipients,
            ..Self::default()
        }
    }

    /// Notifications accepted so far.
    pub fn sent(&self) -> Vec<OutgoingNotification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl NotificationSink for MockNotificationSink {
    async fn send(&self, notification: &OutgoingNotification) -> Result<(), DispatchError> {
        if self.simulate_failure || self.failing_recipients.contains(&notification.recipient_id) {
            tracing::warn!(
                recipient_id = %notification.recipient_id,
                entity = %notification.entity,
                "Mock notification sink simulating failure"
            );
            return Err(DispatchError::Failed("Simulated failure".to_string()));
        }

        tracing::info!(
            recipient_id = %notification.recipient_id,
            entity = %notification.entity,
            title = %notification.title,
            "Mock: Would send reminder notification"
        );

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{default_rules, EntityType};
    use chrono::Utc;

    fn notification(recipient_id: Uuid) -> OutgoingNotification {
        let rule = default_rules().remove(0).into_rule(Utc::now());
        let entity = EntityRef {
            entity_type: EntityType::Task,
            entity_id: Uuid::nil(),
        };
        let ctx = TemplateContext::new()
            .with("title", "Fix printer")
            .with("days", 1)
            .with("entityId", Uuid::nil());
        OutgoingNotification::render(&rule, entity, recipient_id, &ctx)
    }

    #[test]
    fn test_render_all_templates() {
        let n = notification(Uuid::nil());
        assert_eq!(n.title, "Task due soon");
        assert_eq!(n.body, "Task 'Fix printer' is due in 1 days.");
        assert_eq!(
            n.action_url,
            "/tasks/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(n.action_text, "Open task");
        assert_eq!(n.priority, Priority::Medium);
    }

    #[tokio::test]
    async fn test_mock_sink_records() {
        let sink = MockNotificationSink::new();
        let result = sink.send(&notification(Uuid::new_v4())).await;
        assert!(result.is_ok());
        assert_eq!(sink.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_sink_failure() {
        let sink = MockNotificationSink::failing();
        let result = sink.send(&notification(Uuid::new_v4())).await;
        assert!(matches!(result, Err(DispatchError::Failed(_))));
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mock_sink_failing_for_recipient() {
        let bad = Uuid::new_v4();
        let sink = MockNotificationSink::failing_for(vec![bad]);
        assert!(sink.send(&notification(bad)).await.is_err());
        assert!(sink.send(&notification(Uuid::new_v4())).await.is_ok());
        assert_eq!(sink.sent().len(), 1);
    }
}
