//! Notification transports wired into the reminder engine.

pub mod dispatch;
pub mod email;

pub use dispatch::ChannelRouter;
pub use email::{Contact, ContactDirectory, EmailReminderSink, EmailService};
