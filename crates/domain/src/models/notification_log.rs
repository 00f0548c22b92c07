//! Notification ledger domain model.
//!
//! Rows are append-only. A `sent` row suppresses further notifications for
//! the same [`LedgerKey`] until the rule's cooldown window has passed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::reminder_rule::{EntityType, NotificationType};

/// Outcome recorded for a firing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Pending,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            "pending" => Ok(DeliveryStatus::Pending),
            _ => Err(format!("Invalid delivery status: {}", s)),
        }
    }
}

/// Deduplication key of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub rule_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub recipient_id: Uuid,
}

/// One firing attempt for a (rule, entity, recipient) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationLogEntry {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub recipient_id: Uuid,
    pub notification_type: NotificationType,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl NotificationLogEntry {
    fn new(
        key: LedgerKey,
        notification_type: NotificationType,
        status: DeliveryStatus,
        error_message: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id: key.rule_id,
            entity_type: key.entity_type,
            entity_id: key.entity_id,
            recipient_id: key.recipient_id,
            notification_type,
            status,
            error_message,
            sent_at: at,
        }
    }

    pub fn sent(key: LedgerKey, notification_type: NotificationType, at: DateTime<Utc>) -> Self {
        Self::new(key, notification_type, DeliveryStatus::Sent, None, at)
    }

    pub fn failed(
        key: LedgerKey,
        notification_type: NotificationType,
        error: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            key,
            notification_type,
            DeliveryStatus::Failed,
            Some(error.into()),
            at,
        )
    }

    pub fn key(&self) -> LedgerKey {
        LedgerKey {
            rule_id: self.rule_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            recipient_id: self.recipient_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> LedgerKey {
        LedgerKey {
            rule_id: Uuid::new_v4(),
            entity_type: EntityType::Task,
            entity_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_sent_entry() {
        let k = key();
        let now = Utc::now();
        let entry = NotificationLogEntry::sent(k, NotificationType::InApp, now);
        assert_eq!(entry.status, DeliveryStatus::Sent);
        assert_eq!(entry.error_message, None);
        assert_eq!(entry.sent_at, now);
        assert_eq!(entry.key(), k);
    }

    #[test]
    fn test_failed_entry_keeps_error() {
        let entry =
            NotificationLogEntry::failed(key(), NotificationType::Email, "smtp down", Utc::now());
        assert_eq!(entry.status, DeliveryStatus::Failed);
        assert_eq!(entry.error_message.as_deref(), Some("smtp down"));
    }

    #[test]
    fn test_delivery_status_strings() {
        assert_eq!(DeliveryStatus::Sent.to_string(), "sent");
        assert_eq!("failed".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::Failed);
        assert!("ok".parse::<DeliveryStatus>().is_err());
    }
}
