//! Application state for the Meter API service.

use std::sync::Arc;
use std::time::Duration;

use meter_core::MeteringApi;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Metering capability set; every tenant-scoped call takes a `Principal`
    pub metering: Arc<dyn MeteringApi>,
    request_timeout: Duration,
}

impl AppState {
    /// Create new application state
    pub fn new(metering: Arc<dyn MeteringApi>, request_timeout: Duration) -> Self {
        Self {
            metering,
            request_timeout,
        }
    }

    /// Get request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
