//! Bounded retry with exponential backoff for transient completion failures.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use conceptlens_shared::{CompletionError, RetryConfig};
use tracing::{debug, warn};

use crate::CompletionClient;

/// How often and how patiently a failed call is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based): doubles each time, capped.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// Returns the last error once retries are exhausted.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, CompletionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CompletionError>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff_for(attempt - 1);
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient completion failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(label, attempt, error = %e, "giving up on completion call");
                    return Err(e);
                }
            }
        }
    }
}

/// Decorates any [`CompletionClient`] with a [`RetryPolicy`].
pub struct Retrying<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> Retrying<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<C: CompletionClient> CompletionClient for Retrying<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.policy
            .run(self.inner.name(), || self.inner.complete(prompt))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Replays a fixed sequence of results, then keeps returning the last one.
    struct Scripted {
        script: Mutex<Vec<Result<String, CompletionError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut script: Vec<Result<String, CompletionError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop().unwrap()
            } else {
                script.last().cloned().unwrap()
            }
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(3_000),
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(3_000));
        assert_eq!(policy.backoff_for(40), Duration::from_millis(3_000));
    }

    #[test]
    fn zero_attempts_is_clamped() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 0,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
        });
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let client = Retrying::new(
            Scripted::new(vec![
                Err(CompletionError::Transient("HTTP 429".into())),
                Err(CompletionError::Timeout(5)),
                Ok("chlorophyll".into()),
            ]),
            fast_policy(3),
        );

        let out = client.complete("prompt").await.unwrap();
        assert_eq!(out, "chlorophyll");
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_stop_at_max_attempts() {
        let client = Retrying::new(
            Scripted::new(vec![Err(CompletionError::Transient("HTTP 503".into()))]),
            fast_policy(3),
        );

        let err = client.complete("prompt").await.unwrap_err();
        assert_eq!(err, CompletionError::Transient("HTTP 503".into()));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let client = Retrying::new(
            Scripted::new(vec![Err(CompletionError::Permanent("HTTP 401".into()))]),
            fast_policy(5),
        );

        let err = client.complete("prompt").await.unwrap_err();
        assert!(matches!(err, CompletionError::Permanent(_)));
        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }
}
