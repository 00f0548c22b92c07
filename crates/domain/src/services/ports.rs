//! Collaborators consumed by the scan orchestrator.
//!
//! The persistence crate provides PostgreSQL implementations; `in_memory`
//! provides test doubles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::RepositoryError;
use crate::models::{
    EntityRef, EntitySnapshot, EntityType, LedgerKey, NotificationLogEntry, Priority,
    ReminderRule, TriggerType,
};

/// Source of reminder rules.
#[async_trait::async_trait]
pub trait RuleRepository: Send + Sync {
    /// All rules with `is_active = true`.
    async fn list_active(&self) -> Result<Vec<ReminderRule>, RepositoryError>;
}

/// Position of the last candidate of a page.
///
/// Candidates are ordered by reference date (missing dates last), then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCursor {
    pub reference_date: Option<DateTime<Utc>>,
    pub id: Uuid,
}

impl CandidateCursor {
    pub fn after(entity: &EntitySnapshot) -> Self {
        Self {
            reference_date: entity.reference_date().0,
            id: entity.id(),
        }
    }

    /// Cursor for the next page when `read` rows came back for a page of `limit`.
    pub fn next_page(read: usize, limit: i64, last: Option<Self>) -> Option<Self> {
        if read as i64 >= limit {
            last
        } else {
            None
        }
    }

    /// Whether `entity` sorts strictly after this cursor.
    pub fn precedes(&self, entity: &EntitySnapshot) -> bool {
        let key = |date: Option<DateTime<Utc>>, id: Uuid| (date.is_none(), date, id);
        key(entity.reference_date().0, entity.id()) > key(self.reference_date, self.id)
    }
}

/// Pre-filter for candidate entities.
///
/// Narrows the volume fetched for a rule; the evaluator re-checks every
/// candidate, so an over-inclusive query is never incorrect. Results come
/// back in cursor order, at most `limit` per page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuery {
    pub entity_type: EntityType,
    pub trigger_type: TriggerType,
    pub now: DateTime<Utc>,
    /// Inclusive lower bound on the reference date.
    pub reference_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the reference date.
    pub reference_until: Option<DateTime<Utc>>,
    /// When non-empty, only entities in one of these statuses.
    pub include_statuses: Vec<String>,
    /// Entities in these statuses are never candidates.
    pub exclude_statuses: Vec<String>,
    pub team_id: Option<Uuid>,
    pub limit: i64,
    /// Resume after this candidate; `None` starts from the first page.
    pub after: Option<CandidateCursor>,
}

/// One page of candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePage {
    pub entities: Vec<EntitySnapshot>,
    /// Where the next page starts; `None` once the source is exhausted.
    ///
    /// Taken from the last row read, which may be a row that could not be
    /// turned into an entity.
    pub next: Option<CandidateCursor>,
}

/// Fetches candidate entities for a rule.
#[async_trait::async_trait]
pub trait EntityRepository: Send + Sync {
    async fn find_candidates(&self, query: &CandidateQuery)
        -> Result<CandidatePage, RepositoryError>;
}

/// Maps an entity to the users who should be reminded about it.
#[async_trait::async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve(&self, entity: &EntitySnapshot) -> Result<Vec<Uuid>, RepositoryError>;
}

/// A follow-up task to create when a rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpTask {
    pub rule_id: Uuid,
    pub title: String,
    pub priority: Priority,
    pub linked_entity: EntityRef,
    pub assignee_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

/// Creates follow-up tasks.
#[async_trait::async_trait]
pub trait TaskCreator: Send + Sync {
    async fn create(&self, task: &FollowUpTask) -> Result<Uuid, RepositoryError>;
}

/// Append-only notification log used for deduplication.
#[async_trait::async_trait]
pub trait NotificationLedger: Send + Sync {
    /// Whether a `sent` row exists for `key` with `sent_at >= since`.
    async fn was_recently_notified(
        &self,
        key: &LedgerKey,
        since: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    async fn record(&self, entry: &NotificationLogEntry) -> Result<(), RepositoryError>;
}
