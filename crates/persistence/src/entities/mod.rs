//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod crm;
pub mod reminder_rule;

pub use crm::{CandidateRow, InvoiceRow, QuoteRow, TaskRow, UserContactRow};
pub use reminder_rule::ReminderRuleEntity;
