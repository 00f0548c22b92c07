//! In-memory collaborators for tests and dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use crate::errors::RepositoryError;
use crate::models::{
    missing_default_rules, DeliveryStatus, EntitySnapshot, LedgerKey, NotificationLogEntry,
    ReminderRule,
};
use crate::services::ports::{
    CandidateCursor, CandidatePage, CandidateQuery, EntityRepository, FollowUpTask,
    NotificationLedger, RuleRepository, TaskCreator,
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unavailable() -> RepositoryError {
    RepositoryError::Unavailable("in-memory store marked unavailable".to_string())
}

#[derive(Debug, Default)]
pub struct InMemoryRuleRepository {
    rules: Mutex<Vec<ReminderRule>>,
    unavailable: AtomicBool,
}

impl InMemoryRuleRepository {
    pub fn new(rules: Vec<ReminderRule>) -> Self {
        Self {
            rules: Mutex::new(rules),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn insert(&self, rule: ReminderRule) {
        lock(&self.rules).push(rule);
    }

    /// Insert the default rules that are not present yet. Returns how many
    /// were inserted.
    pub fn seed_defaults(&self, now: DateTime<Utc>) -> usize {
        let mut rules = lock(&self.rules);
        let existing: Vec<Uuid> = rules.iter().map(|r| r.id).collect();
        let missing = missing_default_rules(&existing, now);
        let inserted = missing.len();
        rules.extend(missing);
        inserted
    }

    pub fn set_active(&self, rule_id: Uuid, active: bool) {
        if let Some(rule) = lock(&self.rules).iter_mut().find(|r| r.id == rule_id) {
            rule.is_active = active;
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn list_active(&self) -> Result<Vec<ReminderRule>, RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(lock(&self.rules)
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }
}

/// Entity store that applies [`CandidateQuery`] filters and records every query.
#[derive(Debug, Default)]
pub struct InMemoryEntityRepository {
    entities: Mutex<Vec<EntitySnapshot>>,
    queries: Mutex<Vec<CandidateQuery>>,
    unavailable: AtomicBool,
}

impl InMemoryEntityRepository {
    pub fn new(entities: Vec<EntitySnapshot>) -> Self {
        Self {
            entities: Mutex::new(entities),
            ..Self::default()
        }
    }

    /// Insert or replace an entity by id.
    pub fn upsert(&self, entity: EntitySnapshot) {
        let mut entities = lock(&self.entities);
        match entities.iter_mut().find(|e| e.id() == entity.id()) {
            Some(existing) => *existing = entity,
            None => entities.push(entity),
        }
    }

    pub fn queries(&self) -> Vec<CandidateQuery> {
        lock(&self.queries).clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn matches(query: &CandidateQuery, entity: &EntitySnapshot) -> bool {
        if entity.entity_type() != query.entity_type {
            return false;
        }
        let status = entity.status_str();
        if !query.include_statuses.is_empty() && !query.include_statuses.iter().any(|s| s == status) {
            return false;
        }
        if query.exclude_statuses.iter().any(|s| s == status) {
            return false;
        }
        if query.team_id.is_some() && entity.team_id() != query.team_id {
            return false;
        }
        if query.after.is_some_and(|cursor| !cursor.precedes(entity)) {
            return false;
        }
        // Entities without a reference date pass through so the evaluator
        // can report them.
        match entity.reference_date().0 {
            Some(date) => {
                query.reference_from.map_or(true, |from| date >= from)
                    && query.reference_until.map_or(true, |until| date < until)
            }
            None => true,
        }
    }
}

#[async_trait]
impl EntityRepository for InMemoryEntityRepository {
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<CandidatePage, RepositoryError> {
        lock(&self.queries).push(query.clone());
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let limit = usize::try_from(query.limit).unwrap_or(0);
        let mut found: Vec<EntitySnapshot> = lock(&self.entities)
            .iter()
            .filter(|e| Self::matches(query, e))
            .cloned()
            .collect();
        found.sort_by_key(|e| {
            let date = e.reference_date().0;
            (date.is_none(), date, e.id())
        });
        found.truncate(limit);
        let next = CandidateCursor::next_page(
            found.len(),
            query.limit,
            found.last().map(CandidateCursor::after),
        );
        Ok(CandidatePage {
            entities: found,
            next,
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Mutex<Vec<NotificationLogEntry>>,
    unavailable: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<NotificationLogEntry> {
        lock(&self.entries).clone()
    }

    pub fn entries_with_status(&self, status: DeliveryStatus) -> Vec<NotificationLogEntry> {
        lock(&self.entries)
            .iter()
            .filter(|e| e.status == status)
            .cloned()
            .collect()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationLedger for InMemoryLedger {
    async fn was_recently_notified(
        &self,
        key: &LedgerKey,
        since: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(lock(&self.entries).iter().any(|e| {
            e.status == DeliveryStatus::Sent && e.key() == *key && e.sent_at >= since
        }))
    }

    async fn record(&self, entry: &NotificationLogEntry) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        lock(&self.entries).push(entry.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTaskCreator {
    tasks: Mutex<Vec<FollowUpTask>>,
    simulate_failure: AtomicBool,
}

impl InMemoryTaskCreator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: AtomicBool::new(true),
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<FollowUpTask> {
        lock(&self.tasks).clone()
    }
}

#[async_trait]
impl TaskCreator for InMemoryTaskCreator {
    async fn create(&self, task: &FollowUpTask) -> Result<Uuid, RepositoryError> {
        if self.simulate_failure.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("task insert rejected".to_string()));
        }
        lock(&self.tasks).push(task.clone());
        Ok(Uuid::new_v4())
    }
}
