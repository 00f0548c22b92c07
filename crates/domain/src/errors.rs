//! Error taxonomy for the reminder engine.
//!
//! Per-item errors ([`RuleConfigError`], [`EvaluationError`], [`DispatchError`])
//! are absorbed by the orchestrator. [`RepositoryError`] is infrastructure and
//! surfaces as a cycle-level [`ScanError`].

use thiserror::Error;
use uuid::Uuid;

use crate::models::{EntityType, TriggerType};

/// A rule that cannot be executed as configured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleConfigError {
    #[error("{field} template is blank")]
    MissingTemplate { field: &'static str },

    #[error("trigger {trigger} is not applicable to {entity_type} rules")]
    UnsupportedTrigger {
        trigger: TriggerType,
        entity_type: EntityType,
    },

    #[error("{field} must be non-negative, got {value}")]
    NegativeThreshold { field: &'static str, value: i32 },

    #[error("{field} must be at most {max}, got {value}")]
    ThresholdTooLarge {
        field: &'static str,
        value: i32,
        max: i32,
    },

    #[error("auto_create_task is enabled but task_title_template is blank")]
    MissingTaskTitle,
}

/// An entity snapshot that cannot be evaluated against a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("{entity_type} {entity_id} has no {field}")]
    MissingDate {
        entity_type: EntityType,
        entity_id: Uuid,
        field: &'static str,
    },

    #[error("trigger {trigger} does not apply to {entity_type}")]
    UnsupportedTrigger {
        trigger: TriggerType,
        entity_type: EntityType,
    },

    #[error("rule targets {expected} but entity is a {actual}")]
    EntityTypeMismatch {
        expected: EntityType,
        actual: EntityType,
    },
}

/// A notification sink failed to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{channel} channel unavailable: {reason}")]
    ChannelUnavailable { channel: &'static str, reason: String },

    #[error("recipient {0} has no address for this channel")]
    NoAddress(Uuid),

    #[error("delivery failed: {0}")]
    Failed(String),
}

/// The repository layer could not serve a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("invalid row: {0}")]
    InvalidRow(String),
}

/// A scan cycle aborted before completion.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to load active rules: {0}")]
    RulesUnavailable(#[source] RepositoryError),

    #[error("failed to load candidates for rule {rule_id}: {source}")]
    Candidates {
        rule_id: Uuid,
        #[source]
        source: RepositoryError,
    },

    #[error("notification ledger unavailable: {0}")]
    Ledger(#[source] RepositoryError),
}
