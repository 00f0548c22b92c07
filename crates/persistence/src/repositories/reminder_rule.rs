//! Reminder rule repository.
//!
//! Rules are authored by administrators through the CRM; this service reads
//! them and seeds the system defaults.

use chrono::{DateTime, Utc};
use domain::errors::RepositoryError;
use domain::models::{default_rules, missing_default_rules, ReminderRule};
use domain::services::RuleRepository;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::reminder_rule::{ReminderRuleEntity, RULE_COLUMNS};
use crate::metrics::QueryTimer;
use crate::repositories::map_db_error;

/// Repository for reminder rule database operations.
#[derive(Clone)]
pub struct ReminderRuleRepository {
    pool: PgPool,
}

impl ReminderRuleRepository {
    /// Creates a new ReminderRuleRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active rules, system-wide ones first.
    pub async fn find_active(&self) -> Result<Vec<ReminderRuleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_reminder_rules");
        let sql = format!(
            "SELECT {} FROM reminder_rules WHERE is_active = true ORDER BY team_id NULLS FIRST, created_at",
            RULE_COLUMNS
        );
        let result = sqlx::query_as::<_, ReminderRuleEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Insert the system default rules that are not present yet.
    ///
    /// Existing rows are left untouched, including ones an administrator
    /// has edited or disabled. Returns the number of rules inserted.
    pub async fn seed_defaults(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("seed_default_reminder_rules");
        let ids: Vec<Uuid> = default_rules().iter().filter_map(|r| r.id).collect();

        let mut tx = self.pool.begin().await?;
        let existing: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM reminder_rules WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&mut *tx)
                .await?;
        let existing: Vec<Uuid> = existing.into_iter().map(|(id,)| id).collect();

        let mut inserted = 0;
        for rule in missing_default_rules(&existing, now) {
            // A concurrent seed may have inserted it since the lookup.
            if insert_rule(&mut *tx, &rule).await?.is_some() {
                inserted += 1;
            }
        }
        tx.commit().await?;
        timer.record();
        Ok(inserted)
    }
}

async fn insert_rule<'e, E>(executor: E, rule: &ReminderRule) -> Result<Option<ReminderRuleEntity>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        r#"
        INSERT INTO reminder_rules (
            id, name, entity_type, trigger_type, days_before, days_after, priority,
            notification_type, is_active, title_template, body_template,
            action_url_template, action_text_template, auto_create_task,
            task_title_template, task_priority, fire_once, team_id, created_by,
            updated_by, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
        ON CONFLICT (id) DO NOTHING
        RETURNING {}
        "#,
        RULE_COLUMNS
    );
    sqlx::query_as::<_, ReminderRuleEntity>(&sql)
        .bind(rule.id)
        .bind(&rule.name)
        .bind(rule.entity_type.as_str())
        .bind(rule.trigger_type.as_str())
        .bind(rule.days_before)
        .bind(rule.days_after)
        .bind(rule.priority.as_str())
        .bind(rule.notification_type.as_str())
        .bind(rule.is_active)
        .bind(&rule.title_template)
        .bind(&rule.body_template)
        .bind(&rule.action_url_template)
        .bind(&rule.action_text_template)
        .bind(rule.auto_create_task)
        .bind(&rule.task_title_template)
        .bind(rule.task_priority.as_str())
        .bind(rule.fire_once)
        .bind(rule.team_id)
        .bind(rule.created_by)
        .bind(rule.updated_by)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .fetch_optional(executor)
        .await
}

#[async_trait::async_trait]
impl RuleRepository for ReminderRuleRepository {
    async fn list_active(&self) -> Result<Vec<ReminderRule>, RepositoryError> {
        let rows = self.find_active().await.map_err(map_db_error)?;
        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match ReminderRule::try_from(row) {
                Ok(rule) => rules.push(rule),
                Err(e) => tracing::warn!(rule_id = %id, error = %e, "Ignoring unreadable reminder rule"),
            }
        }
        Ok(rules)
    }
}
