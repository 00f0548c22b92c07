//! Candidate lookup over the CRM tables.

use domain::errors::RepositoryError;
use domain::models::{EntitySnapshot, EntityType};
use domain::services::{CandidateCursor, CandidatePage, CandidateQuery, EntityRepository};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use crate::entities::{CandidateRow, InvoiceRow, QuoteRow, TaskRow};
use crate::metrics::QueryTimer;
use crate::repositories::map_db_error;

const TASK_SELECT: &str = r#"
    SELECT t.id, t.title, t.status, t.due_date, t.assignee_id, t.team_id
    FROM tasks t
    WHERE 1 = 1
"#;

const QUOTE_SELECT: &str = r#"
    SELECT q.id, q.quote_number, q.title, i.name AS institution_name,
           q.amount::float8 AS amount, q.status, q.expires_at, q.owner_id, q.team_id
    FROM quotes q
    LEFT JOIN institutions i ON i.id = q.institution_id
    WHERE 1 = 1
"#;

const INVOICE_SELECT: &str = r#"
    SELECT v.id, v.invoice_number, i.name AS institution_name,
           v.amount::float8 AS amount, v.status, v.due_date, v.created_by, v.team_id
    FROM invoices v
    LEFT JOIN institutions i ON i.id = v.institution_id
    WHERE 1 = 1
"#;

/// Reads reminder candidates from the tasks, quotes and invoices tables.
#[derive(Clone)]
pub struct CrmEntityRepository {
    pool: PgPool,
}

impl CrmEntityRepository {
    /// Creates a new CrmEntityRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build the filtered candidate query for one entity table.
    ///
    /// `alias` is the table alias used in `select`, `date_column` the
    /// entity's reference date.
    pub fn build_query<'q>(
        select: &str,
        alias: &str,
        date_column: &str,
        query: &'q CandidateQuery,
    ) -> QueryBuilder<'q, Postgres> {
        let mut builder = QueryBuilder::<Postgres>::new(select);

        if !query.include_statuses.is_empty() {
            builder
                .push(format!(" AND {}.status = ANY(", alias))
                .push_bind(&query.include_statuses)
                .push(")");
        }
        if !query.exclude_statuses.is_empty() {
            builder
                .push(format!(" AND NOT ({}.status = ANY(", alias))
                .push_bind(&query.exclude_statuses)
                .push("))");
        }
        if let Some(from) = query.reference_from {
            builder
                .push(format!(" AND {}.{} >= ", alias, date_column))
                .push_bind(from);
        }
        if let Some(until) = query.reference_until {
            builder
                .push(format!(" AND {}.{} < ", alias, date_column))
                .push_bind(until);
        }
        if let Some(team_id) = query.team_id {
            builder
                .push(format!(" AND {}.team_id = ", alias))
                .push_bind(team_id);
        }

        match query.after {
            Some(CandidateCursor {
                reference_date: Some(date),
                id,
            }) => {
                builder
                    .push(format!(" AND ({}.{} > ", alias, date_column))
                    .push_bind(date)
                    .push(format!(" OR ({}.{} = ", alias, date_column))
                    .push_bind(date)
                    .push(format!(" AND {}.id > ", alias))
                    .push_bind(id)
                    .push(format!(") OR {}.{} IS NULL)", alias, date_column));
            }
            Some(CandidateCursor {
                reference_date: None,
                id,
            }) => {
                builder
                    .push(format!(" AND {}.{} IS NULL AND {}.id > ", alias, date_column, alias))
                    .push_bind(id);
            }
            None => {}
        }

        builder
            .push(format!(
                " ORDER BY {}.{} ASC NULLS LAST, {}.id LIMIT ",
                alias, date_column, alias
            ))
            .push_bind(query.limit);
        builder
    }

    async fn fetch<R>(
        &self,
        name: &'static str,
        mut builder: QueryBuilder<'_, Postgres>,
        limit: i64,
    ) -> Result<CandidatePage, RepositoryError>
    where
        R: for<'r> FromRow<'r, sqlx::postgres::PgRow> + CandidateRow + Send + Unpin,
        EntitySnapshot: TryFrom<R, Error = RepositoryError>,
    {
        let timer = QueryTimer::new(name);
        let rows = builder.build_query_as::<R>().fetch_all(&self.pool).await;
        timer.record();

        Ok(into_page(rows.map_err(map_db_error)?, limit))
    }
}

/// Convert fetched rows into a page, skipping rows that do not map to an
/// entity. The cursor still advances past skipped rows.
fn into_page<R>(rows: Vec<R>, limit: i64) -> CandidatePage
where
    R: CandidateRow,
    EntitySnapshot: TryFrom<R, Error = RepositoryError>,
{
    let read = rows.len();
    let last = rows.last().map(CandidateRow::cursor);
    let mut entities = Vec::with_capacity(read);
    for row in rows {
        match EntitySnapshot::try_from(row) {
            Ok(entity) => entities.push(entity),
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable reminder candidate"),
        }
    }

    CandidatePage {
        entities,
        next: CandidateCursor::next_page(read, limit, last),
    }
}

#[async_trait::async_trait]
impl EntityRepository for CrmEntityRepository {
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<CandidatePage, RepositoryError> {
        match query.entity_type {
            EntityType::Task => {
                let builder = Self::build_query(TASK_SELECT, "t", "due_date", query);
                self.fetch::<TaskRow>("find_task_reminder_candidates", builder, query.limit)
                    .await
            }
            EntityType::Quote => {
                let builder = Self::build_query(QUOTE_SELECT, "q", "expires_at", query);
                self.fetch::<QuoteRow>("find_quote_reminder_candidates", builder, query.limit)
                    .await
            }
            EntityType::Invoice => {
                let builder = Self::build_query(INVOICE_SELECT, "v", "due_date", query);
                self.fetch::<InvoiceRow>("find_invoice_reminder_candidates", builder, query.limit)
                    .await
            }
        }
    }
}
