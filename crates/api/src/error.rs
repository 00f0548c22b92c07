use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::jobs::ScanRunError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "timeout", msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "service_unavailable",
                    msg.clone(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ScanRunError> for ApiError {
    fn from(err: ScanRunError) -> Self {
        match err {
            ScanRunError::Busy => ApiError::Conflict(err.to_string()),
            ScanRunError::TimedOut(_) => ApiError::Timeout(err.to_string()),
            ScanRunError::Scan(e) => ApiError::ServiceUnavailable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::errors::{RepositoryError, ScanError};
    use std::time::Duration;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::Unauthorized("bad token".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Conflict("busy".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Timeout("slow".into()).into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::Internal("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::ServiceUnavailable("db down".into())
                .into_response()
                .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_scan_run_error_mapping() {
        assert!(matches!(
            ApiError::from(ScanRunError::Busy),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(ScanRunError::TimedOut(Duration::from_secs(240))),
            ApiError::Timeout(_)
        ));

        let err = ApiError::from(ScanRunError::Scan(ScanError::Ledger(
            RepositoryError::Unavailable("pool timed out".into()),
        )));
        match err {
            ApiError::ServiceUnavailable(msg) => assert!(msg.contains("ledger")),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            ApiError::Unauthorized("test".into()).to_string(),
            "Unauthorized: test"
        );
        assert_eq!(ApiError::Timeout("test".into()).to_string(), "Timeout: test");
    }
}
