//! Whole-day date arithmetic.
//!
//! Reminder thresholds are expressed in days. Differences are taken between
//! UTC calendar dates so the time-of-day never shifts a result by one.

use chrono::{DateTime, NaiveTime, Utc};

/// Midnight UTC of the day containing `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Number of calendar days from `from` to `to`. Negative when `to` is earlier.
pub fn whole_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

/// Calendar days remaining until `target`, seen from `now`.
pub fn days_until(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    whole_days_between(now, target)
}

/// Calendar days elapsed since `reference`, seen from `now`.
pub fn days_since(reference: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    whole_days_between(reference, now)
}
