//! Domain models for the CRM reminder service.

pub mod entity_snapshot;
pub mod notification_log;
pub mod reminder_rule;
pub mod scan_report;

pub use entity_snapshot::{
    EntityRef, EntitySnapshot, InvoiceSnapshot, InvoiceStatus, QuoteSnapshot, QuoteStatus,
    TaskSnapshot, TaskStatus,
};
pub use notification_log::{DeliveryStatus, LedgerKey, NotificationLogEntry};
pub use reminder_rule::{
    default_rules, missing_default_rules, EntityType, NewReminderRule, NotificationType, Priority,
    ReminderRule, TriggerType,
};
pub use scan_report::ScanReport;
