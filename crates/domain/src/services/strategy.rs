//! Per-entity-type strategies.
//!
//! Everything that differs between tasks, quotes and invoices goes through
//! [`strategy_for`]: the candidate pre-filter, who gets reminded, and which
//! fields templates can reference.

use chrono::{DateTime, Duration, Utc};
use shared::template::TemplateContext;
use shared::time::start_of_day;
use uuid::Uuid;

use crate::models::{
    EntitySnapshot, EntityType, InvoiceStatus, QuoteStatus, ReminderRule, TaskStatus, TriggerType,
};
use crate::errors::RepositoryError;
use crate::services::ports::{CandidateQuery, RecipientResolver};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub trait EntityStrategy: Send + Sync {
    fn entity_type(&self) -> EntityType;

    /// Statuses in which an entity of this type is closed.
    fn closed_statuses(&self) -> &'static [&'static str];

    /// Statuses an entity must be in for `trigger` to apply. Empty means any
    /// open status.
    fn required_statuses(&self, _trigger: TriggerType) -> &'static [&'static str] {
        &[]
    }

    /// Users reminded about `entity` when no external resolver overrides it.
    fn recipients(&self, entity: &EntitySnapshot) -> Vec<Uuid>;

    /// Insert this type's template fields into `context`.
    fn template_fields(&self, entity: &EntitySnapshot, context: &mut TemplateContext);

    fn candidate_query(&self, rule: &ReminderRule, now: DateTime<Utc>, limit: i64) -> CandidateQuery {
        let (reference_from, reference_until) = reference_window(rule, now);
        let required = self.required_statuses(rule.trigger_type);
        let (include_statuses, exclude_statuses) = if required.is_empty() {
            (Vec::new(), to_strings(self.closed_statuses()))
        } else {
            (to_strings(required), Vec::new())
        };

        CandidateQuery {
            entity_type: self.entity_type(),
            trigger_type: rule.trigger_type,
            now,
            reference_from,
            reference_until,
            include_statuses,
            exclude_statuses,
            team_id: rule.team_id,
            limit,
            after: None,
        }
    }
}

/// Reference-date bounds `[from, until)` that can possibly satisfy `rule` at `now`.
///
/// A bound that falls outside the representable date range is left open.
pub fn reference_window(
    rule: &ReminderRule,
    now: DateTime<Utc>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let today = start_of_day(now);
    match rule.trigger_type {
        TriggerType::DueSoon => (
            Some(today),
            shift_days(today, i64::from(rule.days_before) + 1),
        ),
        TriggerType::Overdue | TriggerType::Expired | TriggerType::Unpaid => (
            None,
            shift_days(today, 1 - i64::from(rule.days_after)),
        ),
    }
}

fn shift_days(date: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|d| date.checked_add_signed(d))
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

pub struct TaskStrategy;

impl EntityStrategy for TaskStrategy {
    fn entity_type(&self) -> EntityType {
        EntityType::Task
    }

    fn closed_statuses(&self) -> &'static [&'static str] {
        static CLOSED: [&str; 2] = [TaskStatus::Completed.as_str(), TaskStatus::Cancelled.as_str()];
        &CLOSED
    }

    fn recipients(&self, entity: &EntitySnapshot) -> Vec<Uuid> {
        match entity {
            EntitySnapshot::Task(task) => task.assignee_id.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn template_fields(&self, entity: &EntitySnapshot, context: &mut TemplateContext) {
        if let EntitySnapshot::Task(task) = entity {
            context.insert("title", &task.title);
            context.insert("dueDate", format_date(task.due_date));
            context.insert("status", task.status);
        }
    }
}

pub struct QuoteStrategy;

impl EntityStrategy for QuoteStrategy {
    fn entity_type(&self) -> EntityType {
        EntityType::Quote
    }

    fn closed_statuses(&self) -> &'static [&'static str] {
        static CLOSED: [&str; 3] = [
            QuoteStatus::Accepted.as_str(),
            QuoteStatus::Rejected.as_str(),
            QuoteStatus::Ordered.as_str(),
        ];
        &CLOSED
    }

    fn recipients(&self, entity: &EntitySnapshot) -> Vec<Uuid> {
        match entity {
            EntitySnapshot::Quote(quote) => quote.owner_id.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn template_fields(&self, entity: &EntitySnapshot, context: &mut TemplateContext) {
        if let EntitySnapshot::Quote(quote) = entity {
            context.insert("quoteNumber", &quote.quote_number);
            context.insert(
                "title",
                quote.title.as_deref().unwrap_or(&quote.quote_number),
            );
            context.insert(
                "institutionName",
                quote.institution_name.as_deref().unwrap_or_default(),
            );
            context.insert("amount", format!("{:.2}", quote.amount));
            context.insert("expiresAt", format_date(quote.expires_at));
            context.insert("status", quote.status);
        }
    }
}

pub struct InvoiceStrategy;

impl EntityStrategy for InvoiceStrategy {
    fn entity_type(&self) -> EntityType {
        EntityType::Invoice
    }

    fn closed_statuses(&self) -> &'static [&'static str] {
        static CLOSED: [&str; 2] = [InvoiceStatus::Paid.as_str(), InvoiceStatus::Cancelled.as_str()];
        &CLOSED
    }

    fn required_statuses(&self, trigger: TriggerType) -> &'static [&'static str] {
        static OUTSTANDING: [&str; 3] = [
            InvoiceStatus::Sent.as_str(),
            InvoiceStatus::PartiallyPaid.as_str(),
            InvoiceStatus::Overdue.as_str(),
        ];
        match trigger {
            TriggerType::Unpaid => &OUTSTANDING,
            _ => &[],
        }
    }

    fn recipients(&self, entity: &EntitySnapshot) -> Vec<Uuid> {
        match entity {
            EntitySnapshot::Invoice(invoice) => invoice.created_by.into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn template_fields(&self, entity: &EntitySnapshot, context: &mut TemplateContext) {
        if let EntitySnapshot::Invoice(invoice) = entity {
            context.insert("invoiceNumber", &invoice.invoice_number);
            context.insert(
                "institutionName",
                invoice.institution_name.as_deref().unwrap_or_default(),
            );
            context.insert("amount", format!("{:.2}", invoice.amount));
            context.insert("dueDate", format_date(invoice.due_date));
            context.insert("status", invoice.status);
        }
    }
}

static TASK_STRATEGY: TaskStrategy = TaskStrategy;
static QUOTE_STRATEGY: QuoteStrategy = QuoteStrategy;
static INVOICE_STRATEGY: InvoiceStrategy = InvoiceStrategy;

/// Strategy table lookup.
pub fn strategy_for(entity_type: EntityType) -> &'static dyn EntityStrategy {
    match entity_type {
        EntityType::Task => &TASK_STRATEGY,
        EntityType::Quote => &QUOTE_STRATEGY,
        EntityType::Invoice => &INVOICE_STRATEGY,
    }
}

/// Full template context for a firing: rule-level keys plus the entity's fields.
pub fn template_context(
    rule: &ReminderRule,
    entity: &EntitySnapshot,
    days_delta: i64,
) -> TemplateContext {
    let mut context = TemplateContext::new()
        .with("days", days_delta)
        .with("priority", rule.priority)
        .with("ruleName", &rule.name)
        .with("entityType", entity.entity_type())
        .with("entityId", entity.id());
    strategy_for(entity.entity_type()).template_fields(entity, &mut context);
    context
}

/// Resolves recipients from the entity's own owner fields.
///
/// Used when no directory lookup is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerRecipientResolver;

#[async_trait::async_trait]
impl RecipientResolver for OwnerRecipientResolver {
    async fn resolve(&self, entity: &EntitySnapshot) -> Result<Vec<Uuid>, RepositoryError> {
        Ok(strategy_for(entity.entity_type()).recipients(entity))
    }
}
