//! Background job scheduler and job implementations.

mod reminder_log_cleanup;
mod reminder_scan;
mod scheduler;

pub use reminder_log_cleanup::ReminderLogCleanupJob;
pub use reminder_scan::{ReminderScanJob, ReminderScanner, ScanRunError};
pub use scheduler::{Job, JobFrequency, JobScheduler};
