//! Repository implementations for database operations.

pub mod crm_entity;
pub mod in_app_notification;
pub mod notification_log;
pub mod recipient;
pub mod reminder_rule;
pub mod task;

pub use crm_entity::CrmEntityRepository;
pub use in_app_notification::InAppNotificationRepository;
pub use notification_log::NotificationLogRepository;
pub use recipient::RecipientRepository;
pub use reminder_rule::ReminderRuleRepository;
pub use task::TaskRepository;

use domain::errors::RepositoryError;

/// Map a driver error onto the domain's repository error.
///
/// Connection-level failures are reported as unavailability so callers can
/// tell an outage from a bad query.
pub fn map_db_error(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Unavailable(err.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            RepositoryError::InvalidRow(err.to_string())
        }
        other => RepositoryError::Query(other.to_string()),
    }
}
