//! Trigger evaluation.
//!
//! Decides whether a rule's temporal condition holds for one entity at a
//! given instant. Pure: no I/O, no clock access.

use chrono::{DateTime, Utc};
use shared::time::{days_since, days_until};

use crate::errors::EvaluationError;
use crate::models::{EntitySnapshot, ReminderRule, TriggerType};

/// Result of evaluating one rule against one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub fires: bool,
    /// Days remaining (`due_soon`) or days elapsed (other triggers).
    pub days_delta: i64,
}

impl TriggerOutcome {
    fn when(fires: bool, days_delta: i64) -> Self {
        Self { fires, days_delta }
    }

    fn closed() -> Self {
        Self {
            fires: false,
            days_delta: 0,
        }
    }
}

/// Evaluate `rule` against `entity` at `now`.
///
/// Closed entities never fire, whatever their dates. Day deltas are whole
/// UTC calendar days.
pub fn evaluate(
    rule: &ReminderRule,
    entity: &EntitySnapshot,
    now: DateTime<Utc>,
) -> Result<TriggerOutcome, EvaluationError> {
    let entity_type = entity.entity_type();
    if entity_type != rule.entity_type {
        return Err(EvaluationError::EntityTypeMismatch {
            expected: rule.entity_type,
            actual: entity_type,
        });
    }
    if !rule.trigger_type.supports(entity_type) {
        return Err(EvaluationError::UnsupportedTrigger {
            trigger: rule.trigger_type,
            entity_type,
        });
    }

    let open = match (rule.trigger_type, entity) {
        (TriggerType::Unpaid, EntitySnapshot::Invoice(invoice)) => invoice.status.is_outstanding(),
        _ => !entity.is_terminal(),
    };
    if !open {
        return Ok(TriggerOutcome::closed());
    }

    let (reference, field) = entity.reference_date();
    let reference = reference.ok_or(EvaluationError::MissingDate {
        entity_type,
        entity_id: entity.id(),
        field,
    })?;

    let outcome = match rule.trigger_type {
        TriggerType::DueSoon => {
            let remaining = days_until(reference, now);
            TriggerOutcome::when(
                (0..=i64::from(rule.days_before)).contains(&remaining),
                remaining,
            )
        }
        TriggerType::Overdue | TriggerType::Expired | TriggerType::Unpaid => {
            let elapsed = days_since(reference, now);
            TriggerOutcome::when(elapsed >= i64::from(rule.days_after), elapsed)
        }
    };

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        default_rules, EntityType, InvoiceSnapshot, InvoiceStatus, QuoteSnapshot, QuoteStatus,
        TaskSnapshot, TaskStatus,
    };
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 9, 30, 0).unwrap()
    }

    fn rule(entity_type: EntityType, trigger_type: TriggerType) -> ReminderRule {
        let mut rule = default_rules().remove(0).into_rule(now());
        rule.entity_type = entity_type;
        rule.trigger_type = trigger_type;
        rule
    }

    fn task(status: TaskStatus, due: Option<DateTime<Utc>>) -> EntitySnapshot {
        EntitySnapshot::Task(TaskSnapshot {
            id: Uuid::new_v4(),
            title: "Fix printer".into(),
            status,
            due_date: due,
            assignee_id: Some(Uuid::new_v4()),
            team_id: None,
        })
    }

    fn quote(status: QuoteStatus, expires: DateTime<Utc>) -> EntitySnapshot {
        EntitySnapshot::Quote(QuoteSnapshot {
            id: Uuid::new_v4(),
            quote_number: "Q-001".into(),
            title: None,
            institution_name: None,
            amount: 100.0,
            status,
            expires_at: Some(expires),
            owner_id: None,
            team_id: None,
        })
    }

    fn invoice(status: InvoiceStatus, due: DateTime<Utc>) -> EntitySnapshot {
        EntitySnapshot::Invoice(InvoiceSnapshot {
            id: Uuid::new_v4(),
            invoice_number: "F-001".into(),
            institution_name: None,
            amount: 100.0,
            status,
            due_date: Some(due),
            created_by: None,
            team_id: None,
        })
    }

    #[test]
    fn test_due_soon_boundary() {
        let mut r = rule(EntityType::Task, TriggerType::DueSoon);
        r.days_before = 3;

        let at_edge = task(TaskStatus::Todo, Some(now() + Duration::days(3)));
        assert_eq!(
            evaluate(&r, &at_edge, now()).unwrap(),
            TriggerOutcome { fires: true, days_delta: 3 }
        );

        let past_edge = task(TaskStatus::Todo, Some(now() + Duration::days(4)));
        assert!(!evaluate(&r, &past_edge, now()).unwrap().fires);
    }

    #[test]
    fn test_due_soon_today_and_past() {
        let mut r = rule(EntityType::Task, TriggerType::DueSoon);
        r.days_before = 3;

        let later_today = task(TaskStatus::InProgress, Some(now() + Duration::hours(5)));
        assert_eq!(evaluate(&r, &later_today, now()).unwrap().days_delta, 0);
        assert!(evaluate(&r, &later_today, now()).unwrap().fires);

        let yesterday = task(TaskStatus::Todo, Some(now() - Duration::days(1)));
        assert!(!evaluate(&r, &yesterday, now()).unwrap().fires);
    }

    #[test]
    fn test_due_soon_ignores_time_of_day() {
        let mut r = rule(EntityType::Task, TriggerType::DueSoon);
        r.days_before = 1;
        // Tomorrow 23:59 is still one calendar day away from 09:30 today.
        let due = Utc.with_ymd_and_hms(2024, 6, 13, 23, 59, 0).unwrap();
        let outcome = evaluate(&r, &task(TaskStatus::Todo, Some(due)), now()).unwrap();
        assert_eq!(outcome, TriggerOutcome { fires: true, days_delta: 1 });
    }

    #[test]
    fn test_overdue_boundary() {
        let mut r = rule(EntityType::Task, TriggerType::Overdue);
        r.days_after = 2;

        let at_edge = task(TaskStatus::Todo, Some(now() - Duration::days(2)));
        assert_eq!(
            evaluate(&r, &at_edge, now()).unwrap(),
            TriggerOutcome { fires: true, days_delta: 2 }
        );

        let not_yet = task(TaskStatus::Todo, Some(now() - Duration::days(1)));
        assert!(!evaluate(&r, &not_yet, now()).unwrap().fires);

        let long_overdue = task(TaskStatus::Todo, Some(now() - Duration::days(30)));
        assert_eq!(evaluate(&r, &long_overdue, now()).unwrap().days_delta, 30);
    }

    #[test]
    fn test_completed_task_never_fires() {
        let mut r = rule(EntityType::Task, TriggerType::Overdue);
        r.days_after = 0;
        let done = task(TaskStatus::Completed, Some(now() - Duration::days(10)));
        assert!(!evaluate(&r, &done, now()).unwrap().fires);

        let cancelled = task(TaskStatus::Cancelled, None);
        assert!(!evaluate(&r, &cancelled, now()).unwrap().fires);
    }

    #[test]
    fn test_missing_date_is_error() {
        let r = rule(EntityType::Task, TriggerType::Overdue);
        let err = evaluate(&r, &task(TaskStatus::Todo, None), now()).unwrap_err();
        assert!(matches!(err, EvaluationError::MissingDate { field: "due_date", .. }));
    }

    #[test]
    fn test_expired_quote() {
        let mut r = rule(EntityType::Quote, TriggerType::Expired);
        r.days_after = 7;

        let expired = quote(QuoteStatus::Sent, now() - Duration::days(8));
        assert_eq!(
            evaluate(&r, &expired, now()).unwrap(),
            TriggerOutcome { fires: true, days_delta: 8 }
        );

        let recent = quote(QuoteStatus::Expired, now() - Duration::days(6));
        assert!(!evaluate(&r, &recent, now()).unwrap().fires);

        for status in [QuoteStatus::Accepted, QuoteStatus::Rejected, QuoteStatus::Ordered] {
            let decided = quote(status, now() - Duration::days(30));
            assert!(!evaluate(&r, &decided, now()).unwrap().fires);
        }
    }

    #[test]
    fn test_unpaid_invoice() {
        let mut r = rule(EntityType::Invoice, TriggerType::Unpaid);
        r.days_after = 1;

        for status in [
            InvoiceStatus::Sent,
            InvoiceStatus::PartiallyPaid,
            InvoiceStatus::Overdue,
        ] {
            let due = invoice(status, now() - Duration::days(5));
            assert_eq!(
                evaluate(&r, &due, now()).unwrap(),
                TriggerOutcome { fires: true, days_delta: 5 }
            );
        }

        for status in [InvoiceStatus::Draft, InvoiceStatus::Paid, InvoiceStatus::Cancelled] {
            let closed = invoice(status, now() - Duration::days(5));
            assert!(!evaluate(&r, &closed, now()).unwrap().fires);
        }

        let due_today = invoice(InvoiceStatus::Sent, now());
        assert!(!evaluate(&r, &due_today, now()).unwrap().fires);
    }

    #[test]
    fn test_entity_type_mismatch() {
        let r = rule(EntityType::Quote, TriggerType::DueSoon);
        let err = evaluate(&r, &task(TaskStatus::Todo, Some(now())), now()).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::EntityTypeMismatch {
                expected: EntityType::Quote,
                actual: EntityType::Task,
            }
        );
    }

    #[test]
    fn test_unsupported_trigger() {
        let r = rule(EntityType::Task, TriggerType::Expired);
        let err = evaluate(&r, &task(TaskStatus::Todo, Some(now())), now()).unwrap_err();
        assert!(matches!(err, EvaluationError::UnsupportedTrigger { .. }));
    }
}
