//! Recipient lookup against the users table.

use domain::errors::RepositoryError;
use domain::models::EntitySnapshot;
use domain::services::{strategy_for, RecipientResolver};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserContactRow;
use crate::metrics::QueryTimer;
use crate::repositories::map_db_error;

/// Resolves reminder recipients to active users.
#[derive(Clone)]
pub struct RecipientRepository {
    pool: PgPool,
}

impl RecipientRepository {
    /// Creates a new RecipientRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The subset of `ids` belonging to active users.
    pub async fn find_active_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let timer = QueryTimer::new("find_active_user_ids");
        let result: Result<Vec<(Uuid,)>, sqlx::Error> = sqlx::query_as(
            r#"SELECT id FROM users WHERE id = ANY($1) AND is_active = true"#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result.map(|rows| rows.into_iter().map(|(id,)| id).collect())
    }

    /// Email contact of an active user.
    pub async fn find_contact(&self, user_id: Uuid) -> Result<Option<UserContactRow>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_contact");
        let result = sqlx::query_as::<_, UserContactRow>(
            r#"
            SELECT id, email, display_name
            FROM users
            WHERE id = $1 AND is_active = true
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[async_trait::async_trait]
impl RecipientResolver for RecipientRepository {
    /// Owner fields of the entity, restricted to active users, in owner order.
    async fn resolve(&self, entity: &EntitySnapshot) -> Result<Vec<Uuid>, RepositoryError> {
        let owners = strategy_for(entity.entity_type()).recipients(entity);
        let active = self.find_active_ids(&owners).await.map_err(map_db_error)?;
        Ok(owners.into_iter().filter(|id| active.contains(id)).collect())
    }
}
