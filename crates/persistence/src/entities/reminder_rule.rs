//! Reminder rule entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::errors::RepositoryError;
use domain::models::ReminderRule;
use sqlx::FromRow;
use uuid::Uuid;

/// Columns selected by every reminder_rules query.
pub const RULE_COLUMNS: &str = r#"
    id, name, entity_type, trigger_type, days_before, days_after, priority,
    notification_type, is_active, title_template, body_template,
    action_url_template, action_text_template, auto_create_task,
    task_title_template, task_priority, fire_once, team_id, created_by,
    updated_by, created_at, updated_at
"#;

/// Database row mapping for the reminder_rules table.
#[derive(Debug, Clone, FromRow)]
pub struct ReminderRuleEntity {
    pub id: Uuid,
    pub name: String,
    pub entity_type: String,
    pub trigger_type: String,
    pub days_before: i32,
    pub days_after: i32,
    pub priority: String,
    pub notification_type: String,
    pub is_active: bool,
    pub title_template: String,
    pub body_template: String,
    pub action_url_template: String,
    pub action_text_template: String,
    pub auto_create_task: bool,
    pub task_title_template: Option<String>,
    pub task_priority: String,
    pub fire_once: bool,
    pub team_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReminderRuleEntity> for ReminderRule {
    type Error = RepositoryError;

    fn try_from(entity: ReminderRuleEntity) -> Result<Self, Self::Error> {
        let id = entity.id;
        let invalid = move |e: String| RepositoryError::InvalidRow(format!("reminder rule {}: {}", id, e));

        Ok(Self {
            id: entity.id,
            entity_type: entity.entity_type.parse().map_err(invalid)?,
            trigger_type: entity.trigger_type.parse().map_err(invalid)?,
            priority: entity.priority.parse().map_err(invalid)?,
            notification_type: entity.notification_type.parse().map_err(invalid)?,
            task_priority: entity.task_priority.parse().map_err(invalid)?,
            name: entity.name,
            days_before: entity.days_before,
            days_after: entity.days_after,
            is_active: entity.is_active,
            title_template: entity.title_template,
            body_template: entity.body_template,
            action_url_template: entity.action_url_template,
            action_text_template: entity.action_text_template,
            auto_create_task: entity.auto_create_task,
            task_title_template: entity.task_title_template,
            fire_once: entity.fire_once,
            team_id: entity.team_id,
            created_by: entity.created_by,
            updated_by: entity.updated_by,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{EntityType, NotificationType, Priority, TriggerType};

    fn entity() -> ReminderRuleEntity {
        ReminderRuleEntity {
            id: Uuid::new_v4(),
            name: "Invoice unpaid".to_string(),
            entity_type: "invoice".to_string(),
            trigger_type: "unpaid".to_string(),
            days_before: 0,
            days_after: 1,
            priority: "urgent".to_string(),
            notification_type: "both".to_string(),
            is_active: true,
            title_template: "Invoice {invoiceNumber} unpaid".to_string(),
            body_template: "{days} days past due".to_string(),
            action_url_template: "/invoices/{entityId}".to_string(),
            action_text_template: "Open".to_string(),
            auto_create_task: false,
            task_title_template: None,
            task_priority: "medium".to_string(),
            fire_once: false,
            team_id: None,
            created_by: None,
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_reminder_rule_entity_to_domain() {
        let rule = ReminderRule::try_from(entity()).unwrap();
        assert_eq!(rule.entity_type, EntityType::Invoice);
        assert_eq!(rule.trigger_type, TriggerType::Unpaid);
        assert_eq!(rule.priority, Priority::Urgent);
        assert_eq!(rule.notification_type, NotificationType::Both);
        assert_eq!(rule.days_after, 1);
    }

    #[test]
    fn test_unknown_trigger_is_invalid_row() {
        let mut row = entity();
        row.trigger_type = "someday".to_string();
        let err = ReminderRule::try_from(row).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidRow(msg) if msg.contains("someday")));
    }
}
