//! Summary of one scan cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Counters produced by a completed scan cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScanReport {
    pub rules_evaluated: u32,
    /// Active rules skipped because of a configuration error.
    pub rules_skipped: u32,
    pub entities_evaluated: u32,
    /// Entities skipped because they could not be evaluated or resolved.
    pub entities_skipped: u32,
    pub entities_fired: u32,
    pub notifications_sent: u32,
    pub notifications_failed: u32,
    /// Recipients skipped because they were notified inside the cooldown window.
    pub notifications_suppressed: u32,
    pub tasks_created: u32,
    pub tasks_failed: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub previous_completed_at: Option<DateTime<Utc>>,
}

impl ScanReport {
    pub fn started(at: DateTime<Utc>, previous_completed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            started_at: Some(at),
            previous_completed_at,
            ..Self::default()
        }
    }

    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.finished_at = Some(at);
    }

    /// Wall-clock duration in milliseconds, when both ends are known.
    pub fn elapsed_ms(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_started_report_is_zeroed() {
        let now = Utc::now();
        let report = ScanReport::started(now, None);
        assert_eq!(report.started_at, Some(now));
        assert_eq!(report.notifications_sent, 0);
        assert_eq!(report.elapsed_ms(), None);
    }

    #[test]
    fn test_elapsed_ms() {
        let now = Utc::now();
        let mut report = ScanReport::started(now, Some(now - Duration::minutes(5)));
        report.finish(now + Duration::milliseconds(250));
        assert_eq!(report.elapsed_ms(), Some(250));
    }

    #[test]
    fn test_report_serialization() {
        let report = ScanReport {
            notifications_sent: 2,
            ..ScanReport::default()
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"notifications_sent\":2"));
        assert!(json.contains("\"tasks_created\":0"));
    }
}
