//! Read-only projections of the CRM entities scanned by reminder rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::reminder_rule::EntityType;

// ============================================================================
// Status vocabularies
// ============================================================================

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// Lifecycle status of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Ordered,
    Expired,
}

impl QuoteStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Ordered => "ordered",
            QuoteStatus::Expired => "expired",
        }
    }

    /// A decided quote. An `expired` status is not terminal: the customer can
    /// still be chased.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Accepted | QuoteStatus::Rejected | QuoteStatus::Ordered
        )
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(QuoteStatus::Draft),
            "sent" => Ok(QuoteStatus::Sent),
            "accepted" => Ok(QuoteStatus::Accepted),
            "rejected" => Ok(QuoteStatus::Rejected),
            "ordered" => Ok(QuoteStatus::Ordered),
            "expired" => Ok(QuoteStatus::Expired),
            _ => Err(format!("Invalid quote status: {}", s)),
        }
    }
}

/// Lifecycle status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    PartiallyPaid,
    Overdue,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    /// Issued to the customer and still awaiting payment.
    pub fn is_outstanding(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid | InvoiceStatus::Overdue
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "partially_paid" => Ok(InvoiceStatus::PartiallyPaid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(format!("Invalid invoice status: {}", s)),
        }
    }
}

// ============================================================================
// Snapshots
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub id: Uuid,
    pub quote_number: String,
    pub title: Option<String>,
    pub institution_name: Option<String>,
    pub amount: f64,
    pub status: QuoteStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub owner_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSnapshot {
    pub id: Uuid,
    pub invoice_number: String,
    pub institution_name: Option<String>,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

/// A candidate entity, tagged by type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "snake_case")]
pub enum EntitySnapshot {
    Task(TaskSnapshot),
    Quote(QuoteSnapshot),
    Invoice(InvoiceSnapshot),
}

impl EntitySnapshot {
    pub fn id(&self) -> Uuid {
        match self {
            EntitySnapshot::Task(t) => t.id,
            EntitySnapshot::Quote(q) => q.id,
            EntitySnapshot::Invoice(i) => i.id,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            EntitySnapshot::Task(_) => EntityType::Task,
            EntitySnapshot::Quote(_) => EntityType::Quote,
            EntitySnapshot::Invoice(_) => EntityType::Invoice,
        }
    }

    pub fn team_id(&self) -> Option<Uuid> {
        match self {
            EntitySnapshot::Task(t) => t.team_id,
            EntitySnapshot::Quote(q) => q.team_id,
            EntitySnapshot::Invoice(i) => i.team_id,
        }
    }

    /// The date temporal triggers are measured against, with its field name.
    pub fn reference_date(&self) -> (Option<DateTime<Utc>>, &'static str) {
        match self {
            EntitySnapshot::Task(t) => (t.due_date, "due_date"),
            EntitySnapshot::Quote(q) => (q.expires_at, "expires_at"),
            EntitySnapshot::Invoice(i) => (i.due_date, "due_date"),
        }
    }

    pub fn status_str(&self) -> &'static str {
        match self {
            EntitySnapshot::Task(t) => t.status.as_str(),
            EntitySnapshot::Quote(q) => q.status.as_str(),
            EntitySnapshot::Invoice(i) => i.status.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            EntitySnapshot::Task(t) => t.status.is_terminal(),
            EntitySnapshot::Quote(q) => q.status.is_terminal(),
            EntitySnapshot::Invoice(i) => i.status.is_terminal(),
        }
    }

    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            entity_type: self.entity_type(),
            entity_id: self.id(),
        }
    }
}

/// Typed reference to a CRM entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}
