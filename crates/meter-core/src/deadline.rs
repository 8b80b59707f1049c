//! Deadline wrapper for storage calls

use std::future::Future;
use std::time::Duration;

use meter_db::DbResult;
use tracing::warn;

use crate::error::{CoreError, CoreResult};

/// Await a storage call for at most `limit`.
///
/// On expiry the future is dropped, which cancels the in-flight statement.
pub(crate) async fn bounded<T, F>(limit: Duration, op: &'static str, call: F) -> CoreResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(CoreError::from),
        Err(_) => {
            warn!(op, timeout_ms = limit.as_millis() as u64, "storage call timed out");
            crate::metrics::record_storage_timeout(op);
            Err(CoreError::Timeout(limit))
        }
    }
}
