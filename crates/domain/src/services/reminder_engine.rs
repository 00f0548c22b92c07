//! Scan orchestration.
//!
//! One call to [`ScanOrchestrator::run_once`] is one scan cycle: load active
//! rules, fetch candidates per rule, evaluate, deduplicate against the
//! ledger, dispatch, record, and optionally create follow-up tasks.

use chrono::{DateTime, Utc};
use shared::template::{render, unresolved, TemplateContext};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::{EvaluationError, ScanError};
use crate::models::{EntitySnapshot, LedgerKey, NotificationLogEntry, ReminderRule, ScanReport};
use crate::services::clock::Clock;
use crate::services::ledger::CooldownPolicy;
use crate::services::notification::{NotificationSink, OutgoingNotification};
use crate::services::ports::{
    EntityRepository, FollowUpTask, NotificationLedger, RecipientResolver, RuleRepository,
    TaskCreator,
};
use crate::services::strategy::{strategy_for, template_context};
use crate::services::trigger::evaluate;

/// Default page size when fetching candidates for a rule.
pub const DEFAULT_CANDIDATE_LIMIT: i64 = 500;

/// Runs scan cycles against injected collaborators.
pub struct ScanOrchestrator {
    rules: Arc<dyn RuleRepository>,
    entities: Arc<dyn EntityRepository>,
    recipients: Arc<dyn RecipientResolver>,
    ledger: Arc<dyn NotificationLedger>,
    sink: Arc<dyn NotificationSink>,
    tasks: Arc<dyn TaskCreator>,
    clock: Arc<dyn Clock>,
    candidate_limit: i64,
}

impl ScanOrchestrator {
    pub fn new(
        rules: Arc<dyn RuleRepository>,
        entities: Arc<dyn EntityRepository>,
        recipients: Arc<dyn RecipientResolver>,
        ledger: Arc<dyn NotificationLedger>,
        sink: Arc<dyn NotificationSink>,
        tasks: Arc<dyn TaskCreator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rules,
            entities,
            recipients,
            ledger,
            sink,
            tasks,
            clock,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
        }
    }

    pub fn with_candidate_limit(mut self, limit: i64) -> Self {
        self.candidate_limit = limit.max(1);
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Run one scan cycle.
    ///
    /// Every ledger row written in this cycle carries the instant the cycle
    /// started. Failures to load rules, candidates or the ledger abort the
    /// cycle. Per-entity and per-recipient failures are counted, written to
    /// the ledger as `failed` and skipped.
    pub async fn run_once(
        &self,
        last_completed_at: Option<DateTime<Utc>>,
    ) -> Result<ScanReport, ScanError> {
        let now = self.clock.now();
        let mut report = ScanReport::started(now, last_completed_at);

        let rules = self
            .rules
            .list_active()
            .await
            .map_err(ScanError::RulesUnavailable)?;

        tracing::debug!(rules = rules.len(), %now, "Starting reminder scan");

        for rule in rules.iter().filter(|r| r.is_active) {
            if let Err(e) = rule.validate_config() {
                tracing::warn!(rule_id = %rule.id, rule = %rule.name, error = %e, "Skipping misconfigured reminder rule");
                report.rules_skipped += 1;
                continue;
            }
            report.rules_evaluated += 1;
            self.scan_rule(rule, now, &mut report).await?;
        }

        report.finish(self.clock.now());

        tracing::info!(
            rules_evaluated = report.rules_evaluated,
            rules_skipped = report.rules_skipped,
            entities_fired = report.entities_fired,
            notifications_sent = report.notifications_sent,
            notifications_failed = report.notifications_failed,
            notifications_suppressed = report.notifications_suppressed,
            tasks_created = report.tasks_created,
            "Reminder scan completed"
        );

        Ok(report)
    }

    /// Page through every candidate of `rule` and process each one.
    async fn scan_rule(
        &self,
        rule: &ReminderRule,
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) -> Result<(), ScanError> {
        let mut query =
            strategy_for(rule.entity_type).candidate_query(rule, now, self.candidate_limit);

        loop {
            let page = self
                .entities
                .find_candidates(&query)
                .await
                .map_err(|source| ScanError::Candidates {
                    rule_id: rule.id,
                    source,
                })?;

            for entity in &page.entities {
                self.scan_entity(rule, entity, now, report).await?;
            }

            match page.next {
                Some(cursor) if query.after != Some(cursor) => query.after = Some(cursor),
                _ => break,
            }
        }

        Ok(())
    }

    async fn scan_entity(
        &self,
        rule: &ReminderRule,
        entity: &EntitySnapshot,
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) -> Result<(), ScanError> {
        if !rule.applies_to_team(entity.team_id()) {
            return Ok(());
        }
        report.entities_evaluated += 1;

        let outcome = match evaluate(rule, entity, now) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    rule_id = %rule.id,
                    entity = %entity.entity_ref(),
                    error = %e,
                    "Could not evaluate entity"
                );
                report.entities_skipped += 1;
                return self.record_evaluation_failure(rule, entity, &e, now).await;
            }
        };
        if !outcome.fires {
            return Ok(());
        }
        report.entities_fired += 1;

        let recipients = match self.recipients.resolve(entity).await {
            Ok(recipients) => dedup(recipients),
            Err(e) => {
                tracing::warn!(
                    rule_id = %rule.id,
                    entity = %entity.entity_ref(),
                    error = %e,
                    "Could not resolve reminder recipients"
                );
                report.entities_skipped += 1;
                return Ok(());
            }
        };
        if recipients.is_empty() {
            tracing::debug!(rule_id = %rule.id, entity = %entity.entity_ref(), "No recipients");
            return Ok(());
        }

        let context = template_context(rule, entity, outcome.days_delta);
        let missing: Vec<&str> = unresolved(&rule.title_template, &context)
            .into_iter()
            .chain(unresolved(&rule.body_template, &context))
            .collect();
        if !missing.is_empty() {
            tracing::debug!(rule_id = %rule.id, placeholders = ?missing, "Template placeholders left unresolved");
        }

        let notified = self
            .notify_recipients(rule, entity, &recipients, &context, now, report)
            .await?;

        if rule.auto_create_task {
            if let Some(assignee) = notified {
                self.create_follow_up(rule, entity, assignee, &context, report)
                    .await;
            }
        }

        Ok(())
    }

    /// Write a `failed` ledger row for each recipient of an entity that
    /// could not be evaluated.
    async fn record_evaluation_failure(
        &self,
        rule: &ReminderRule,
        entity: &EntitySnapshot,
        error: &EvaluationError,
        now: DateTime<Utc>,
    ) -> Result<(), ScanError> {
        let recipients = match self.recipients.resolve(entity).await {
            Ok(recipients) => dedup(recipients),
            Err(e) => {
                tracing::warn!(
                    rule_id = %rule.id,
                    entity = %entity.entity_ref(),
                    error = %e,
                    "Could not resolve recipients of unevaluable entity"
                );
                return Ok(());
            }
        };

        let entity_ref = entity.entity_ref();
        for recipient_id in recipients {
            let key = LedgerKey {
                rule_id: rule.id,
                entity_type: entity_ref.entity_type,
                entity_id: entity_ref.entity_id,
                recipient_id,
            };
            let entry =
                NotificationLogEntry::failed(key, rule.notification_type, error.to_string(), now);
            self.ledger.record(&entry).await.map_err(ScanError::Ledger)?;
        }

        Ok(())
    }

    /// Notify each recipient not already covered by the cooldown window.
    /// Returns the first recipient that was successfully notified.
    async fn notify_recipients(
        &self,
        rule: &ReminderRule,
        entity: &EntitySnapshot,
        recipients: &[Uuid],
        context: &TemplateContext,
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) -> Result<Option<Uuid>, ScanError> {
        let since = CooldownPolicy::for_rule(rule).window_start(now);
        let entity_ref = entity.entity_ref();
        let mut first_notified = None;

        for &recipient_id in recipients {
            let key = LedgerKey {
                rule_id: rule.id,
                entity_type: entity_ref.entity_type,
                entity_id: entity_ref.entity_id,
                recipient_id,
            };

            let recent = self
                .ledger
                .was_recently_notified(&key, since)
                .await
                .map_err(ScanError::Ledger)?;
            if recent {
                report.notifications_suppressed += 1;
                continue;
            }

            let notification =
                OutgoingNotification::render(rule, entity_ref, recipient_id, context);

            let entry = match self.sink.send(&notification).await {
                Ok(()) => {
                    report.notifications_sent += 1;
                    first_notified.get_or_insert(recipient_id);
                    NotificationLogEntry::sent(key, rule.notification_type, now)
                }
                Err(e) => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        entity = %entity_ref,
                        recipient_id = %recipient_id,
                        error = %e,
                        "Reminder delivery failed"
                    );
                    report.notifications_failed += 1;
                    NotificationLogEntry::failed(key, rule.notification_type, e.to_string(), now)
                }
            };

            self.ledger.record(&entry).await.map_err(ScanError::Ledger)?;
        }

        Ok(first_notified)
    }

    async fn create_follow_up(
        &self,
        rule: &ReminderRule,
        entity: &EntitySnapshot,
        assignee_id: Uuid,
        context: &TemplateContext,
        report: &mut ScanReport,
    ) {
        let template = rule.task_title_template.as_deref().unwrap_or_default();
        let task = FollowUpTask {
            rule_id: rule.id,
            title: render(template, context),
            priority: rule.task_priority,
            linked_entity: entity.entity_ref(),
            assignee_id: Some(assignee_id),
            team_id: entity.team_id(),
        };

        match self.tasks.create(&task).await {
            Ok(task_id) => {
                tracing::info!(rule_id = %rule.id, %task_id, entity = %task.linked_entity, "Created follow-up task");
                report.tasks_created += 1;
            }
            Err(e) => {
                tracing::warn!(rule_id = %rule.id, entity = %task.linked_entity, error = %e, "Failed to create follow-up task");
                report.tasks_failed += 1;
            }
        }
    }
}

/// Drop repeated recipients, keeping first occurrence order.
fn dedup(recipients: Vec<Uuid>) -> Vec<Uuid> {
    let mut unique = Vec::with_capacity(recipients.len());
    for id in recipients {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup(vec![a, b, a, b, a]), vec![a, b]);
        assert!(dedup(Vec::new()).is_empty());
    }
}
