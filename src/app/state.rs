//! Application state management.

use std::sync::Arc;
use std::time::Duration;

use super::broadcaster::Broadcaster;
use super::planner::SweepPlanner;
use super::service::AppService;

/// Request timeout when none is derived from configuration
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
    /// Upper bound applied to every HTTP request
    pub request_timeout: Duration,
}

impl AppState {
    /// Create a new application state
    #[must_use]
    pub fn new(planner: Arc<SweepPlanner>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            service: Arc::new(AppService::new(planner, broadcaster)),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
