//! Read-only row mappings for the CRM tables scanned by reminder rules.

use chrono::{DateTime, Utc};
use domain::errors::RepositoryError;
use domain::models::{EntitySnapshot, InvoiceSnapshot, QuoteSnapshot, TaskSnapshot};
use domain::services::CandidateCursor;
use sqlx::FromRow;
use uuid::Uuid;

fn invalid(table: &str, id: Uuid) -> impl Fn(String) -> RepositoryError + '_ {
    move |e| RepositoryError::InvalidRow(format!("{} {}: {}", table, id, e))
}

/// A candidate row whose position is known before it is converted.
pub trait CandidateRow {
    fn cursor(&self) -> CandidateCursor;
}

/// Row of the tasks table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

impl CandidateRow for TaskRow {
    fn cursor(&self) -> CandidateCursor {
        CandidateCursor {
            reference_date: self.due_date,
            id: self.id,
        }
    }
}

impl TryFrom<TaskRow> for EntitySnapshot {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(EntitySnapshot::Task(TaskSnapshot {
            status: row.status.parse().map_err(invalid("task", row.id))?,
            id: row.id,
            title: row.title,
            due_date: row.due_date,
            assignee_id: row.assignee_id,
            team_id: row.team_id,
        }))
    }
}

/// Row of the quotes table joined with its institution.
#[derive(Debug, Clone, FromRow)]
pub struct QuoteRow {
    pub id: Uuid,
    pub quote_number: String,
    pub title: Option<String>,
    pub institution_name: Option<String>,
    pub amount: f64,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub owner_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

impl CandidateRow for QuoteRow {
    fn cursor(&self) -> CandidateCursor {
        CandidateCursor {
            reference_date: self.expires_at,
            id: self.id,
        }
    }
}

impl TryFrom<QuoteRow> for EntitySnapshot {
    type Error = RepositoryError;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        Ok(EntitySnapshot::Quote(QuoteSnapshot {
            status: row.status.parse().map_err(invalid("quote", row.id))?,
            id: row.id,
            quote_number: row.quote_number,
            title: row.title,
            institution_name: row.institution_name,
            amount: row.amount,
            expires_at: row.expires_at,
            owner_id: row.owner_id,
            team_id: row.team_id,
        }))
    }
}

/// Row of the invoices table joined with its institution.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub institution_name: Option<String>,
    pub amount: f64,
    pub status: String,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

impl CandidateRow for InvoiceRow {
    fn cursor(&self) -> CandidateCursor {
        CandidateCursor {
            reference_date: self.due_date,
            id: self.id,
        }
    }
}

impl TryFrom<InvoiceRow> for EntitySnapshot {
    type Error = RepositoryError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(EntitySnapshot::Invoice(InvoiceSnapshot {
            status: row.status.parse().map_err(invalid("invoice", row.id))?,
            id: row.id,
            invoice_number: row.invoice_number,
            institution_name: row.institution_name,
            amount: row.amount,
            due_date: row.due_date,
            created_by: row.created_by,
            team_id: row.team_id,
        }))
    }
}

/// Recipient row used by the email channel.
#[derive(Debug, Clone, FromRow)]
pub struct UserContactRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{EntityType, InvoiceStatus};

    #[test]
    fn test_invoice_row_to_snapshot() {
        let row = InvoiceRow {
            id: Uuid::new_v4(),
            invoice_number: "F-2024-001".to_string(),
            institution_name: Some("École Pasteur".to_string()),
            amount: 250.0,
            status: "partially_paid".to_string(),
            due_date: Some(Utc::now()),
            created_by: Some(Uuid::new_v4()),
            team_id: None,
        };

        let snapshot = EntitySnapshot::try_from(row).unwrap();
        assert_eq!(snapshot.entity_type(), EntityType::Invoice);
        match snapshot {
            EntitySnapshot::Invoice(invoice) => {
                assert_eq!(invoice.status, InvoiceStatus::PartiallyPaid)
            }
            other => panic!("unexpected snapshot {:?}", other),
        }
    }

    #[test]
    fn test_unknown_task_status_is_invalid_row() {
        let row = TaskRow {
            id: Uuid::new_v4(),
            title: "Call".to_string(),
            status: "archived".to_string(),
            due_date: None,
            assignee_id: None,
            team_id: None,
        };
        let err = EntitySnapshot::try_from(row).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidRow(msg) if msg.starts_with("task ")));
    }
}
