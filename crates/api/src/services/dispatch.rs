//! Channel routing for reminder notifications.

use async_trait::async_trait;
use domain::errors::DispatchError;
use domain::models::NotificationType;
use domain::services::{NotificationSink, OutgoingNotification};
use std::sync::Arc;
use tracing::warn;

use super::email::EMAIL_CHANNEL;

const IN_APP_CHANNEL: &str = "in_app";

/// Routes each notification to the sinks its rule's channel names.
///
/// For [`NotificationType::Both`] the delivery succeeds when at least one
/// channel accepts it; the error of the first failing channel is returned
/// only when every channel fails.
///
/// A partial success is recorded in the ledger as `sent`, so the channel
/// that failed is not retried by later scans. Its error is only logged.
pub struct ChannelRouter {
    in_app: Arc<dyn NotificationSink>,
    email: Option<Arc<dyn NotificationSink>>,
}

impl ChannelRouter {
    pub fn new(in_app: Arc<dyn NotificationSink>) -> Self {
        Self {
            in_app,
            email: None,
        }
    }

    pub fn with_email(mut self, email: Arc<dyn NotificationSink>) -> Self {
        self.email = Some(email);
        self
    }

    async fn send_email(&self, notification: &OutgoingNotification) -> Result<(), DispatchError> {
        match &self.email {
            Some(email) => email.send(notification).await,
            None => Err(DispatchError::ChannelUnavailable {
                channel: EMAIL_CHANNEL,
                reason: "email channel not configured".to_string(),
            }),
        }
    }
}

#[async_trait]
impl NotificationSink for ChannelRouter {
    async fn send(&self, notification: &OutgoingNotification) -> Result<(), DispatchError> {
        match notification.notification_type {
            NotificationType::InApp => self.in_app.send(notification).await,
            NotificationType::Email => self.send_email(notification).await,
            NotificationType::Both => {
                let in_app = self.in_app.send(notification).await;
                let email = self.send_email(notification).await;
                match (in_app, email) {
                    (Ok(()), Ok(())) => Ok(()),
                    (Ok(()), Err(e)) => {
                        partial_delivery(notification, EMAIL_CHANNEL, &e);
                        Ok(())
                    }
                    (Err(e), Ok(())) => {
                        partial_delivery(notification, IN_APP_CHANNEL, &e);
                        Ok(())
                    }
                    (Err(e), Err(_)) => Err(e),
                }
            }
        }
    }
}

fn partial_delivery(
    notification: &OutgoingNotification,
    failed_channel: &str,
    error: &DispatchError,
) {
    warn!(
        recipient_id = %notification.recipient_id,
        entity = %notification.entity,
        channel = failed_channel,
        error = %error,
        "Reminder delivered on one channel only, the other is not retried"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{EntityRef, EntityType, Priority};
    use domain::services::MockNotificationSink;
    use uuid::Uuid;

    fn notification(notification_type: NotificationType) -> OutgoingNotification {
        OutgoingNotification {
            rule_id: Uuid::new_v4(),
            notification_type,
            recipient_id: Uuid::new_v4(),
            entity: EntityRef {
                entity_type: EntityType::Task,
                entity_id: Uuid::new_v4(),
            },
            title: "Task due soon".to_string(),
            body: "Task 'Fix printer' is due in 3 days.".to_string(),
            action_url: "/tasks/1".to_string(),
            action_text: "Open task".to_string(),
            priority: Priority::Medium,
        }
    }

    struct Sinks {
        in_app: Arc<MockNotificationSink>,
        email: Arc<MockNotificationSink>,
        router: ChannelRouter,
    }

    fn sinks(in_app: MockNotificationSink, email: MockNotificationSink) -> Sinks {
        let in_app = Arc::new(in_app);
        let email = Arc::new(email);
        let router = ChannelRouter::new(in_app.clone()).with_email(email.clone());
        Sinks {
            in_app,
            email,
            router,
        }
    }

    #[tokio::test]
    async fn test_in_app_only() {
        let s = sinks(MockNotificationSink::new(), MockNotificationSink::new());
        s.router
            .send(&notification(NotificationType::InApp))
            .await
            .unwrap();
        assert_eq!(s.in_app.sent().len(), 1);
        assert!(s.email.sent().is_empty());
    }

    #[tokio::test]
    async fn test_email_only() {
        let s = sinks(MockNotificationSink::new(), MockNotificationSink::new());
        s.router
            .send(&notification(NotificationType::Email))
            .await
            .unwrap();
        assert!(s.in_app.sent().is_empty());
        assert_eq!(s.email.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_both_succeeds_when_one_channel_delivers() {
        let s = sinks(MockNotificationSink::new(), MockNotificationSink::failing());
        let result = s.router.send(&notification(NotificationType::Both)).await;
        assert!(result.is_ok());
        assert_eq!(s.in_app.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_both_with_failed_in_app_leg_still_succeeds() {
        let s = sinks(MockNotificationSink::failing(), MockNotificationSink::new());
        let result = s.router.send(&notification(NotificationType::Both)).await;
        assert!(result.is_ok());
        assert!(s.in_app.sent().is_empty());
        assert_eq!(s.email.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_both_fails_when_every_channel_fails() {
        let s = sinks(MockNotificationSink::failing(), MockNotificationSink::failing());
        let result = s.router.send(&notification(NotificationType::Both)).await;
        assert!(matches!(result, Err(DispatchError::Failed(_))));
    }

    #[tokio::test]
    async fn test_email_without_sink_is_unavailable() {
        let router = ChannelRouter::new(Arc::new(MockNotificationSink::new()));
        let result = router.send(&notification(NotificationType::Email)).await;
        assert!(matches!(
            result,
            Err(DispatchError::ChannelUnavailable { channel: EMAIL_CHANNEL, .. })
        ));

        let both = router.send(&notification(NotificationType::Both)).await;
        assert!(both.is_ok());
    }
}
