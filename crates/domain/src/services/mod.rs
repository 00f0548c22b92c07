//! Domain services for the reminder engine.
//!
//! Services contain business logic that operates on domain models.

pub mod clock;
pub mod in_memory;
pub mod ledger;
pub mod notification;
pub mod ports;
pub mod reminder_engine;
pub mod strategy;
pub mod trigger;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ledger::CooldownPolicy;
pub use notification::{MockNotificationSink, NotificationSink, OutgoingNotification};
pub use ports::{
    CandidateCursor, CandidatePage, CandidateQuery, EntityRepository, FollowUpTask, NotificationLedger, RecipientResolver,
    RuleRepository, TaskCreator,
};
pub use reminder_engine::{ScanOrchestrator, DEFAULT_CANDIDATE_LIMIT};
pub use strategy::{
    reference_window, strategy_for, template_context, EntityStrategy, OwnerRecipientResolver,
};
pub use trigger::{evaluate, TriggerOutcome};
