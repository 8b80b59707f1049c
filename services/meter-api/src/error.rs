//! Error types for the Meter API service.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use meter_core::CoreError;
use serde::Serialize;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid or missing API key")]
    Unauthenticated,

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Core(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthenticated => Self::Unauthenticated,
            other => Self::Core(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::OrganizationNotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Core(err) => StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::OrganizationNotFound => "ORGANIZATION_NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Core(err) => err.error_code(),
        }
    }

    /// Client-facing message; server-side failures stay opaque
    fn message(&self) -> String {
        match self {
            Self::Core(err) if err.is_retryable() => "Service temporarily unavailable".to_string(),
            Self::Core(CoreError::InvalidPeriod) => "period_end must be after period_start".to_string(),
            Self::Core(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log server-side errors
        if status.is_server_error() {
            tracing::error!(error = %self, code, "API error");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.message(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use meter_db::DbError;
    use std::time::Duration;

    #[test]
    fn test_core_unauthenticated_collapses() {
        let err = ApiError::from(CoreError::Unauthenticated);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
    }

    #[test]
    fn test_retryable_errors_are_503() {
        let outage = ApiError::from(CoreError::Storage(DbError::Unavailable("down".into())));
        assert_eq!(outage.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(outage.error_code(), "STORAGE_UNAVAILABLE");

        let timeout = ApiError::from(CoreError::Timeout(Duration::from_secs(5)));
        assert_eq!(timeout.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(timeout.error_code(), "TIMEOUT");
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let err = ApiError::from(CoreError::Storage(DbError::InvalidData(
            "secret column".into(),
        )));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("secret"));
    }

    #[test]
    fn test_body_shape() {
        let body = ErrorResponse {
            error: ErrorDetail {
                code: "UNAUTHENTICATED".to_string(),
                message: "Invalid or missing API key".to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "error": {"code": "UNAUTHENTICATED", "message": "Invalid or missing API key"}
            })
        );
    }

    #[test]
    fn test_invalid_period_is_400() {
        let err = ApiError::from(CoreError::InvalidPeriod);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_PERIOD");
    }
}
