//! Cooldown windows for the notification ledger.

use chrono::{DateTime, Utc};
use shared::time::start_of_day;

use crate::models::ReminderRule;

/// How long a successful send suppresses repeats for the same
/// (rule, entity, recipient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownPolicy {
    /// At most one reminder per UTC calendar day.
    CalendarDay,
    /// At most one reminder ever.
    Forever,
}

impl CooldownPolicy {
    pub fn for_rule(rule: &ReminderRule) -> Self {
        if rule.fire_once {
            CooldownPolicy::Forever
        } else {
            CooldownPolicy::CalendarDay
        }
    }

    /// Earliest `sent_at` that still counts as a recent notification.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            CooldownPolicy::CalendarDay => start_of_day(now),
            CooldownPolicy::Forever => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_rules;
    use chrono::TimeZone;

    #[test]
    fn test_calendar_day_window() {
        let now = Utc.with_ymd_and_hms(2024, 6, 12, 23, 59, 0).unwrap();
        assert_eq!(
            CooldownPolicy::CalendarDay.window_start(now),
            Utc.with_ymd_and_hms(2024, 6, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_policy_follows_fire_once() {
        let mut rule = default_rules().remove(0).into_rule(Utc::now());
        assert_eq!(CooldownPolicy::for_rule(&rule), CooldownPolicy::CalendarDay);

        rule.fire_once = true;
        let policy = CooldownPolicy::for_rule(&rule);
        assert_eq!(policy, CooldownPolicy::Forever);
        assert_eq!(policy.window_start(Utc::now()), DateTime::<Utc>::UNIX_EPOCH);
    }
}
