//! Flow-level errors and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("No wallet session")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0} is already in progress")]
    Busy(String),

    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("Mission {0} already completed")]
    AlreadyCompleted(String),

    #[error("Remote service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Cross-origin request rejected")]
    CrossOrigin,
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl DashboardError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Remote(_) => "REMOTE_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Busy(_) => "BUSY",
            Self::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            Self::AlreadyCompleted(_) => "ALREADY_COMPLETED",
            Self::Timeout(_) => "TIMEOUT",
            Self::Session(_) => "SESSION_ERROR",
            Self::CrossOrigin => "FORBIDDEN",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Remote(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Busy(_) | Self::AlreadyCheckedIn | Self::AlreadyCompleted(_) => StatusCode::CONFLICT,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CrossOrigin => StatusCode::FORBIDDEN,
        }
    }

    /// Worth offering a retry button for
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote(_) | Self::Timeout(_) | Self::Busy(_))
    }
}

impl From<StoreError> for DashboardError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => DashboardError::NotFound(what),
            other => DashboardError::Remote(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for DashboardError {
    fn from(err: anyhow::Error) -> Self {
        DashboardError::Session(format!("{:#}", err))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let details = match &self {
            DashboardError::Remote(msg) | DashboardError::Session(msg) => {
                tracing::error!("{}: {}", self.code(), msg);
                None
            }
            DashboardError::Validation(msg) => Some(msg.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        let not_found: DashboardError = StoreError::NotFound("user 1".to_string()).into();
        assert!(matches!(not_found, DashboardError::NotFound(ref w) if w == "user 1"));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let remote: DashboardError = StoreError::Remote {
            status: Some(503),
            message: "unavailable".to_string(),
        }
        .into();
        assert_eq!(remote.status(), StatusCode::BAD_GATEWAY);
        assert!(remote.is_retryable());
        assert!(remote.to_string().contains("unavailable"));
    }

    #[test]
    fn test_conflict_statuses() {
        assert_eq!(DashboardError::AlreadyCheckedIn.status(), StatusCode::CONFLICT);
        assert_eq!(
            DashboardError::AlreadyCompleted("m1".to_string()).status(),
            StatusCode::CONFLICT
        );
        assert!(!DashboardError::AlreadyCheckedIn.is_retryable());
        assert_eq!(
            DashboardError::Timeout(Duration::from_secs(1)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
