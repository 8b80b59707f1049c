//! Core errors

use std::time::Duration;

use meter_db::DbError;
use meter_types::TypeError;
use thiserror::Error;

/// Metering and billing errors
#[derive(Error, Debug)]
pub enum CoreError {
    /// Credential missing, malformed or unknown. Deliberately indistinct.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Billing period end is not after its start
    #[error("invalid billing period")]
    InvalidPeriod,

    /// Storage failure
    #[error("storage error: {0}")]
    Storage(#[from] DbError),

    /// Storage call exceeded its deadline
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    /// Invoice amount does not fit the money representation
    #[error("invoice amount overflow")]
    AmountOverflow,
}

impl CoreError {
    /// Whether retrying later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(err) => err.is_retryable(),
            Self::Timeout(_) => true,
            Self::Unauthenticated | Self::InvalidPeriod | Self::AmountOverflow => false,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::InvalidPeriod => 400,
            Self::Storage(_) | Self::Timeout(_) if self.is_retryable() => 503,
            Self::Storage(_) | Self::Timeout(_) | Self::AmountOverflow => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidPeriod => "INVALID_PERIOD",
            Self::Storage(err) if err.is_retryable() => "STORAGE_UNAVAILABLE",
            Self::Storage(_) => "INTERNAL_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::AmountOverflow => "AMOUNT_OVERFLOW",
        }
    }
}

impl From<TypeError> for CoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::EmptyPeriod | TypeError::TimestampOutOfRange(_) => Self::InvalidPeriod,
            TypeError::AmountOverflow => Self::AmountOverflow,
            other => Self::Storage(other.into()),
        }
    }
}

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(CoreError::Unauthenticated.status_code(), 401);
        assert_eq!(CoreError::InvalidPeriod.status_code(), 400);
        assert_eq!(
            CoreError::Storage(DbError::Unavailable("down".into())).status_code(),
            503
        );
        assert_eq!(CoreError::Timeout(Duration::from_secs(5)).status_code(), 503);
        assert_eq!(
            CoreError::Storage(DbError::InvalidData("bad".into())).status_code(),
            500
        );
    }

    #[test]
    fn test_retryable() {
        assert!(CoreError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(CoreError::Storage(DbError::Unavailable("down".into())).is_retryable());
        assert!(!CoreError::Unauthenticated.is_retryable());
        assert!(!CoreError::AmountOverflow.is_retryable());
    }

    #[test]
    fn test_period_type_errors_map_to_invalid_period() {
        assert!(matches!(
            CoreError::from(TypeError::EmptyPeriod),
            CoreError::InvalidPeriod
        ));
        assert!(matches!(
            CoreError::from(TypeError::TimestampOutOfRange(i64::MAX)),
            CoreError::InvalidPeriod
        ));
    }
}
