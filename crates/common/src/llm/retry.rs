//! Bounded retry with exponential backoff around any completion service

use super::{Completion, CompletionRequest, CompletionService};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Retry limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Decorator that retries failed completion calls
pub struct RetryingCompletion<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: CompletionService> RetryingCompletion<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: CompletionService> CompletionService for RetryingCompletion<S> {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let mut attempt = 0;

        loop {
            match self.inner.complete(request).await {
                Ok(completion) => return Ok(completion),
                // Only upstream failures are worth another try
                Err(e) if attempt < self.policy.max_retries && matches!(e, AppError::Completion { .. }) => {
                    attempt += 1;
                    let delay = self.policy.delay(attempt);
                    tracing::warn!(
                        provider = self.inner.provider(),
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Completion request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn provider(&self) -> &str {
        self.inner.provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletion;
    use std::sync::Arc;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            instruction: String::new(),
            user_content: "q".to_string(),
            temperature: 0.1,
            max_output_tokens: 200,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = policy(5);
        assert_eq!(p.delay(1), Duration::from_millis(1));
        assert_eq!(p.delay(2), Duration::from_millis(2));
        assert_eq!(p.delay(3), Duration::from_millis(4));
        assert_eq!(p.delay(10), Duration::from_millis(4));
        assert_eq!(p.delay(40), Duration::from_millis(4));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let mock = Arc::new(
            MockCompletion::new()
                .with_failure("503")
                .with_failure("503")
                .with_response("ok"),
        );
        let retrying = RetryingCompletion::new(mock.clone(), policy(2));

        let completion = retrying.complete(&request()).await.unwrap();
        assert_eq!(completion.text, "ok");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let mock = Arc::new(
            MockCompletion::new()
                .with_failure("429")
                .with_failure("429")
                .with_response("too late"),
        );
        let retrying = RetryingCompletion::new(mock.clone(), policy(1));

        let err = retrying.complete(&request()).await.unwrap_err();
        assert!(err.is_upstream());
        assert_eq!(mock.calls(), 2);
    }
}
