//! External trigger for reminder scans.
//!
//! Lets an outside cron drive the scan instead of (or alongside) the
//! in-process scheduler. Both paths share the scanner's single-flight guard.

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use chrono::{DateTime, Utc};
use domain::models::ScanReport;
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;

/// Scanner state exposed to operators.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ScanStatusResponse {
    pub running: bool,
    pub last_completed_at: Option<DateTime<Utc>>,
}

/// Run one reminder scan now and return its report.
///
/// POST /internal/reminders/run
pub async fn run_scan(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ScanReport>, ApiError> {
    authorize(&state.config.scheduler.trigger_token, &headers)?;

    info!("Reminder scan triggered over HTTP");
    let report = state.scanner.run().await?;
    Ok(Json(report))
}

/// GET /internal/reminders/status
pub async fn scan_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ScanStatusResponse>, ApiError> {
    authorize(&state.config.scheduler.trigger_token, &headers)?;

    Ok(Json(ScanStatusResponse {
        running: state.scanner.is_running(),
        last_completed_at: state.scanner.last_completed_at(),
    }))
}

/// Check the bearer token when one is configured.
fn authorize(expected: &str, headers: &HeaderMap) -> Result<(), ApiError> {
    if expected.is_empty() {
        return Ok(());
    }

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if token == expected => Ok(()),
        Some(_) => Err(ApiError::Unauthorized("Invalid trigger token".into())),
        None => Err(ApiError::Unauthorized("Missing bearer token".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_no_token_configured_allows_all() {
        assert!(authorize("", &HeaderMap::new()).is_ok());
        assert!(authorize("", &bearer("anything")).is_ok());
    }

    #[test]
    fn test_matching_token() {
        assert!(authorize("s3cret", &bearer("s3cret")).is_ok());
    }

    #[test]
    fn test_wrong_or_missing_token() {
        assert!(matches!(
            authorize("s3cret", &bearer("nope")),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            authorize("s3cret", &HeaderMap::new()),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
