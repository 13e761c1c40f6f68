//! Shared handler state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use conceptlens_core::Orchestrator;

use crate::error::ApiError;

/// What every handler can reach.
pub struct AppState {
    orchestrator: Option<Arc<Orchestrator>>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, request_timeout: Duration) -> Self {
        Self {
            orchestrator: Some(orchestrator),
            request_timeout,
        }
    }

    /// State without a completion service: only development mode and
    /// health checks can succeed.
    pub fn dev_only(request_timeout: Duration) -> Self {
        Self {
            orchestrator: None,
            request_timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.orchestrator.is_some()
    }

    pub fn prompt_version(&self) -> Option<&str> {
        self.orchestrator.as_deref().map(Orchestrator::prompt_version)
    }

    pub fn orchestrator(&self) -> Result<&Orchestrator, ApiError> {
        self.orchestrator.as_deref().ok_or(ApiError::NotConfigured)
    }

    /// Run `fut` under the request deadline. On expiry the future is dropped,
    /// abandoning any in-flight completion calls.
    pub async fn bounded<T>(&self, fut: impl Future<Output = T>) -> Result<T, ApiError> {
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| ApiError::Timeout(self.request_timeout.as_secs_f64()))
    }
}
