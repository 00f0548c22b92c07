//! Reminder scan background job.
//!
//! The periodic job and the HTTP trigger share one [`ReminderScanner`], whose
//! guard keeps at most one scan cycle in flight.

use chrono::{DateTime, Utc};
use domain::errors::ScanError;
use domain::models::ScanReport;
use domain::services::ScanOrchestrator;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::{record_scan, record_scan_report, ScanOutcome};

/// Why a requested scan did not produce a report.
#[derive(Debug, Error)]
pub enum ScanRunError {
    #[error("a reminder scan is already running")]
    Busy,

    #[error("reminder scan did not finish within {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Single-flight wrapper around the scan orchestrator.
pub struct ReminderScanner {
    orchestrator: ScanOrchestrator,
    in_flight: tokio::sync::Mutex<()>,
    last_completed_at: Mutex<Option<DateTime<Utc>>>,
    timeout: Duration,
}

impl ReminderScanner {
    pub fn new(orchestrator: ScanOrchestrator, timeout: Duration) -> Self {
        Self {
            orchestrator,
            in_flight: tokio::sync::Mutex::new(()),
            last_completed_at: Mutex::new(None),
            timeout,
        }
    }

    /// Finish instant of the last scan that completed successfully.
    pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
        *self
            .last_completed_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Run one scan cycle unless another is already in flight.
    ///
    /// A cycle that fails or overruns the timeout leaves
    /// `last_completed_at` untouched.
    pub async fn run(&self) -> Result<ScanReport, ScanRunError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            record_scan(ScanOutcome::Busy, Duration::ZERO);
            return Err(ScanRunError::Busy);
        };

        let start = Instant::now();
        let previous = self.last_completed_at();

        match tokio::time::timeout(self.timeout, self.orchestrator.run_once(previous)).await {
            Ok(Ok(report)) => {
                let completed_at = report
                    .finished_at
                    .unwrap_or_else(|| self.orchestrator.clock().now());
                *self
                    .last_completed_at
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(completed_at);

                record_scan(ScanOutcome::Completed, start.elapsed());
                record_scan_report(&report);
                Ok(report)
            }
            Ok(Err(e)) => {
                record_scan(ScanOutcome::Failed, start.elapsed());
                Err(ScanRunError::Scan(e))
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Reminder scan abandoned after timeout"
                );
                record_scan(ScanOutcome::TimedOut, start.elapsed());
                Err(ScanRunError::TimedOut(self.timeout))
            }
        }
    }
}

/// Background job that runs a reminder scan every interval.
pub struct ReminderScanJob {
    scanner: Arc<ReminderScanner>,
    interval_secs: u64,
}

impl ReminderScanJob {
    pub fn new(scanner: Arc<ReminderScanner>, interval: Duration) -> Self {
        Self {
            scanner,
            interval_secs: interval.as_secs().max(1),
        }
    }
}

#[async_trait::async_trait]
impl Job for ReminderScanJob {
    fn name(&self) -> &'static str {
        "reminder_scan"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    fn run_on_start(&self) -> bool {
        true
    }

    async fn execute(&self) -> Result<(), String> {
        match self.scanner.run().await {
            Ok(report) => {
                info!(
                    notifications_sent = report.notifications_sent,
                    notifications_failed = report.notifications_failed,
                    tasks_created = report.tasks_created,
                    elapsed_ms = report.elapsed_ms().unwrap_or_default(),
                    "Reminder scan finished"
                );
                Ok(())
            }
            Err(ScanRunError::Busy) => {
                info!("Reminder scan already in flight, skipping tick");
                Ok(())
            }
            Err(e) => Err(format!("Reminder scan failed: {}", e)),
        }
    }
}
