//! Follow-up task creation.

use domain::errors::RepositoryError;
use domain::services::{FollowUpTask, TaskCreator};
use sqlx::PgPool;
use uuid::Uuid;

use crate::metrics::QueryTimer;
use crate::repositories::map_db_error;

/// Writes follow-up tasks into the CRM tasks table.
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    /// Creates a new TaskRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a `todo` task linked to the entity that fired the rule.
    pub async fn insert_follow_up(&self, task: &FollowUpTask) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("insert_follow_up_task");
        let result: Result<(Uuid,), sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO tasks (
                id, title, status, priority, assignee_id, team_id,
                related_entity_type, related_entity_id, source_rule_id, created_at, updated_at
            )
            VALUES ($1, $2, 'todo', $3, $4, $5, $6, $7, $8, NOW(), NOW())
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&task.title)
        .bind(task.priority.as_str())
        .bind(task.assignee_id)
        .bind(task.team_id)
        .bind(task.linked_entity.entity_type.as_str())
        .bind(task.linked_entity.entity_id)
        .bind(task.rule_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(|(id,)| id)
    }
}

#[async_trait::async_trait]
impl TaskCreator for TaskRepository {
    async fn create(&self, task: &FollowUpTask) -> Result<Uuid, RepositoryError> {
        self.insert_follow_up(task).await.map_err(map_db_error)
    }
}
