//! Access to the external generative completion service.
//!
//! This crate provides:
//! - [`CompletionClient`]: the seam every generator talks through
//! - [`OpenAiClient`]: an OpenAI-compatible chat-completions client
//! - [`Retrying`] / [`RetryPolicy`]: bounded retry with exponential backoff

pub mod openai;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;
use conceptlens_shared::{ApiKey, CompletionConfig, CompletionError, Result};
use tracing::info;

pub use openai::OpenAiClient;
pub use retry::{RetryPolicy, Retrying};

/// Sends one fully rendered prompt and returns the raw text output.
///
/// Implementations are stateless request/response and safe to share across
/// concurrent tasks.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Complete a single prompt.
    async fn complete(&self, prompt: &str) -> std::result::Result<String, CompletionError>;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
        (**self).complete(prompt).await
    }
}

/// Build the production client: HTTP transport wrapped in the configured retry policy.
pub fn build_client(config: &CompletionConfig, key: ApiKey) -> Result<Arc<dyn CompletionClient>> {
    let http = OpenAiClient::new(config, key)?;
    let policy = RetryPolicy::from_config(&config.retry);

    info!(
        model = %config.model,
        base_url = %config.base_url,
        max_attempts = policy.max_attempts,
        "completion client ready"
    );

    Ok(Arc::new(Retrying::new(http, policy)))
}
