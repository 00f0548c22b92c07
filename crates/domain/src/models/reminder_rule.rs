//! Reminder rule domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use shared::validation::MAX_THRESHOLD_DAYS;

use crate::errors::RuleConfigError;

// ============================================================================
// Enumerations
// ============================================================================

/// Business entity a rule scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Task,
    Quote,
    Invoice,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Task, EntityType::Quote, EntityType::Invoice];

    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Task => "task",
            EntityType::Quote => "quote",
            EntityType::Invoice => "invoice",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(EntityType::Task),
            "quote" => Ok(EntityType::Quote),
            "invoice" => Ok(EntityType::Invoice),
            _ => Err(format!("Invalid entity type: {}", s)),
        }
    }
}

/// Temporal condition class of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Reference date is within `days_before` days in the future.
    DueSoon,
    /// Reference date passed at least `days_after` days ago.
    Overdue,
    /// Quote validity ended at least `days_after` days ago.
    Expired,
    /// Invoice still outstanding `days_after` days past its due date.
    Unpaid,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::DueSoon => "due_soon",
            TriggerType::Overdue => "overdue",
            TriggerType::Expired => "expired",
            TriggerType::Unpaid => "unpaid",
        }
    }

    /// Whether this trigger has a meaning for the given entity type.
    pub fn supports(&self, entity_type: EntityType) -> bool {
        match self {
            TriggerType::DueSoon | TriggerType::Overdue => true,
            TriggerType::Expired => entity_type == EntityType::Quote,
            TriggerType::Unpaid => entity_type == EntityType::Invoice,
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "due_soon" => Ok(TriggerType::DueSoon),
            "overdue" => Ok(TriggerType::Overdue),
            "expired" => Ok(TriggerType::Expired),
            "unpaid" => Ok(TriggerType::Unpaid),
            _ => Err(format!("Invalid trigger type: {}", s)),
        }
    }
}

/// Priority propagated to notifications and follow-up tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Channel(s) a notification is delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    InApp,
    Email,
    Both,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::InApp => "in_app",
            NotificationType::Email => "email",
            NotificationType::Both => "both",
        }
    }

    pub fn includes_in_app(&self) -> bool {
        matches!(self, NotificationType::InApp | NotificationType::Both)
    }

    pub fn includes_email(&self) -> bool {
        matches!(self, NotificationType::Email | NotificationType::Both)
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_app" => Ok(NotificationType::InApp),
            "email" => Ok(NotificationType::Email),
            "both" => Ok(NotificationType::Both),
            _ => Err(format!("Invalid notification type: {}", s)),
        }
    }
}

// ============================================================================
// Reminder Rule
// ============================================================================

/// A configured reminder rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReminderRule {
    pub id: Uuid,
    pub name: String,
    pub entity_type: EntityType,
    pub trigger_type: TriggerType,
    pub days_before: i32,
    pub days_after: i32,
    pub priority: Priority,
    pub notification_type: NotificationType,
    pub is_active: bool,
    pub title_template: String,
    pub body_template: String,
    pub action_url_template: String,
    pub action_text_template: String,
    pub auto_create_task: bool,
    pub task_title_template: Option<String>,
    pub task_priority: Priority,
    /// Notify each (entity, recipient) once and never again.
    pub fire_once: bool,
    /// `None` means the rule is system-wide.
    pub team_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReminderRule {
    /// Check that the rule can be executed as configured.
    pub fn validate_config(&self) -> Result<(), RuleConfigError> {
        if self.title_template.trim().is_empty() {
            return Err(RuleConfigError::MissingTemplate { field: "title" });
        }
        if self.body_template.trim().is_empty() {
            return Err(RuleConfigError::MissingTemplate { field: "body" });
        }
        if !self.trigger_type.supports(self.entity_type) {
            return Err(RuleConfigError::UnsupportedTrigger {
                trigger: self.trigger_type,
                entity_type: self.entity_type,
            });
        }
        check_threshold("days_before", self.days_before)?;
        check_threshold("days_after", self.days_after)?;
        if self.auto_create_task
            && self
                .task_title_template
                .as_deref()
                .map_or(true, |t| t.trim().is_empty())
        {
            return Err(RuleConfigError::MissingTaskTitle);
        }
        Ok(())
    }

    /// Whether the rule's team scope covers an entity owned by `team_id`.
    pub fn applies_to_team(&self, team_id: Option<Uuid>) -> bool {
        match self.team_id {
            None => true,
            Some(scope) => team_id == Some(scope),
        }
    }
}

fn check_threshold(field: &'static str, value: i32) -> Result<(), RuleConfigError> {
    if value < 0 {
        return Err(RuleConfigError::NegativeThreshold { field, value });
    }
    if value > MAX_THRESHOLD_DAYS {
        return Err(RuleConfigError::ThresholdTooLarge {
            field,
            value,
            max: MAX_THRESHOLD_DAYS,
        });
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_priority() -> Priority {
    Priority::Medium
}

fn default_notification_type() -> NotificationType {
    NotificationType::InApp
}

/// Payload for creating a rule, from an administrator or the seed set.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct NewReminderRule {
    /// Fixed identifier for seeded rules; generated when absent.
    #[serde(default)]
    pub id: Option<Uuid>,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    pub entity_type: EntityType,
    pub trigger_type: TriggerType,

    #[serde(default)]
    #[validate(custom(function = "shared::validation::validate_threshold_days"))]
    pub days_before: i32,

    #[serde(default)]
    #[validate(custom(function = "shared::validation::validate_threshold_days"))]
    pub days_after: i32,

    #[serde(default = "default_priority")]
    pub priority: Priority,

    #[serde(default = "default_notification_type")]
    pub notification_type: NotificationType,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[validate(
        custom(function = "shared::validation::validate_not_blank"),
        length(max = 255, message = "Title template must be at most 255 characters")
    )]
    pub title_template: String,

    #[validate(
        custom(function = "shared::validation::validate_not_blank"),
        length(max = 2000, message = "Body template must be at most 2000 characters")
    )]
    pub body_template: String,

    #[serde(default)]
    #[validate(
        custom(function = "shared::validation::validate_action_url"),
        length(max = 500, message = "Action URL template must be at most 500 characters")
    )]
    pub action_url_template: String,

    #[serde(default)]
    #[validate(length(max = 100, message = "Action text must be at most 100 characters"))]
    pub action_text_template: String,

    #[serde(default)]
    pub auto_create_task: bool,

    #[serde(default)]
    #[validate(length(max = 255, message = "Task title template must be at most 255 characters"))]
    pub task_title_template: Option<String>,

    #[serde(default = "default_priority")]
    pub task_priority: Priority,

    #[serde(default)]
    pub fire_once: bool,

    #[serde(default)]
    pub team_id: Option<Uuid>,

    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl NewReminderRule {
    /// Materialize the rule with the given creation time.
    pub fn into_rule(self, now: DateTime<Utc>) -> ReminderRule {
        ReminderRule {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            entity_type: self.entity_type,
            trigger_type: self.trigger_type,
            days_before: self.days_before,
            days_after: self.days_after,
            priority: self.priority,
            notification_type: self.notification_type,
            is_active: self.is_active,
            title_template: self.title_template,
            body_template: self.body_template,
            action_url_template: self.action_url_template,
            action_text_template: self.action_text_template,
            auto_create_task: self.auto_create_task,
            task_title_template: self.task_title_template,
            task_priority: self.task_priority,
            fire_once: self.fire_once,
            team_id: self.team_id,
            created_by: self.created_by,
            updated_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// System default rules
// ============================================================================

pub const DEFAULT_TASK_DUE_SOON_RULE_ID: Uuid =
    Uuid::from_u128(0x7a1e_0000_0000_4000_8000_0000_0000_0001);
pub const DEFAULT_TASK_OVERDUE_RULE_ID: Uuid =
    Uuid::from_u128(0x7a1e_0000_0000_4000_8000_0000_0000_0002);
pub const DEFAULT_QUOTE_EXPIRING_RULE_ID: Uuid =
    Uuid::from_u128(0x7a1e_0000_0000_4000_8000_0000_0000_0003);
pub const DEFAULT_QUOTE_EXPIRED_RULE_ID: Uuid =
    Uuid::from_u128(0x7a1e_0000_0000_4000_8000_0000_0000_0004);
pub const DEFAULT_INVOICE_DUE_SOON_RULE_ID: Uuid =
    Uuid::from_u128(0x7a1e_0000_0000_4000_8000_0000_0000_0005);
pub const DEFAULT_INVOICE_UNPAID_RULE_ID: Uuid =
    Uuid::from_u128(0x7a1e_0000_0000_4000_8000_0000_0000_0006);

/// The system-wide rules seeded on first start.
///
/// Identifiers are fixed so seeding can be repeated without duplicating rows.
pub fn default_rules() -> Vec<NewReminderRule> {
    let base = |id: Uuid, name: &str, entity_type, trigger_type| NewReminderRule {
        id: Some(id),
        name: name.to_string(),
        entity_type,
        trigger_type,
        days_before: 0,
        days_after: 0,
        priority: Priority::Medium,
        notification_type: NotificationType::InApp,
        is_active: true,
        title_template: String::new(),
        body_template: String::new(),
        action_url_template: String::new(),
        action_text_template: String::new(),
        auto_create_task: false,
        task_title_template: None,
        task_priority: Priority::Medium,
        fire_once: false,
        team_id: None,
        created_by: None,
    };

    vec![
        NewReminderRule {
            days_before: 1,
            title_template: "Task due soon".into(),
            body_template: "Task '{title}' is due in {days} days.".into(),
            action_url_template: "/tasks/{entityId}".into(),
            action_text_template: "Open task".into(),
            ..base(
                DEFAULT_TASK_DUE_SOON_RULE_ID,
                "Task due soon",
                EntityType::Task,
                TriggerType::DueSoon,
            )
        },
        NewReminderRule {
            days_after: 1,
            priority: Priority::High,
            title_template: "Task overdue".into(),
            body_template: "Task '{title}' is {days} days overdue.".into(),
            action_url_template: "/tasks/{entityId}".into(),
            action_text_template: "Open task".into(),
            ..base(
                DEFAULT_TASK_OVERDUE_RULE_ID,
                "Task overdue",
                EntityType::Task,
                TriggerType::Overdue,
            )
        },
        NewReminderRule {
            days_before: 3,
            title_template: "Quote {quoteNumber} expires soon".into(),
            body_template:
                "Quote {quoteNumber} for {institutionName} expires in {days} days.".into(),
            action_url_template: "/quotes/{entityId}".into(),
            action_text_template: "Open quote".into(),
            ..base(
                DEFAULT_QUOTE_EXPIRING_RULE_ID,
                "Quote expiring soon",
                EntityType::Quote,
                TriggerType::DueSoon,
            )
        },
        NewReminderRule {
            days_after: 7,
            priority: Priority::High,
            title_template: "Quote {quoteNumber} expired".into(),
            body_template:
                "Quote {quoteNumber} for {institutionName} expired {days} days ago.".into(),
            action_url_template: "/quotes/{entityId}".into(),
            action_text_template: "Follow up".into(),
            auto_create_task: true,
            task_title_template: Some("Follow up on expired quote {quoteNumber}".into()),
            task_priority: Priority::High,
            ..base(
                DEFAULT_QUOTE_EXPIRED_RULE_ID,
                "Quote expired",
                EntityType::Quote,
                TriggerType::Expired,
            )
        },
        NewReminderRule {
            days_before: 3,
            title_template: "Invoice {invoiceNumber} due soon".into(),
            body_template:
                "Invoice {invoiceNumber} ({amount}) for {institutionName} is due in {days} days."
                    .into(),
            action_url_template: "/invoices/{entityId}".into(),
            action_text_template: "Open invoice".into(),
            ..base(
                DEFAULT_INVOICE_DUE_SOON_RULE_ID,
                "Invoice due soon",
                EntityType::Invoice,
                TriggerType::DueSoon,
            )
        },
        NewReminderRule {
            days_after: 1,
            priority: Priority::Urgent,
            notification_type: NotificationType::Both,
            title_template: "Invoice {invoiceNumber} unpaid".into(),
            body_template:
                "Invoice {invoiceNumber} ({amount}) for {institutionName} is {days} days past due."
                    .into(),
            action_url_template: "/invoices/{entityId}".into(),
            action_text_template: "Open invoice".into(),
            ..base(
                DEFAULT_INVOICE_UNPAID_RULE_ID,
                "Invoice unpaid",
                EntityType::Invoice,
                TriggerType::Unpaid,
            )
        },
    ]
}

/// Default rules whose fixed id is not in `existing`, ready to insert.
pub fn missing_default_rules(existing: &[Uuid], now: DateTime<Utc>) -> Vec<ReminderRule> {
    default_rules()
        .into_iter()
        .filter(|r| r.id.map_or(true, |id| !existing.contains(&id)))
        .map(|r| r.into_rule(now))
        .collect()
}
