//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Backend is not reachable
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be mapped to a domain type
    #[error("invalid stored data: {0}")]
    InvalidData(String),
}

impl DbError {
    /// Whether retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Sqlx(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            ),
            Self::Unavailable(_) => true,
            Self::InvalidData(_) => false,
        }
    }
}

impl From<meter_types::TypeError> for DbError {
    fn from(err: meter_types::TypeError) -> Self {
        Self::InvalidData(err.to_string())
    }
}

/// Result alias for storage operations
pub type DbResult<T> = Result<T, DbError>;
