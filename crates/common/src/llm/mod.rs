//! Completion service abstraction
//!
//! Provides a unified interface for the text-generation providers used by
//! the search pipeline:
//! - Anthropic (Messages API)
//! - OpenAI (Chat Completions, or any compatible endpoint)
//! - Mock (scripted responses for tests and offline development)

mod anthropic;
mod mock;
mod openai;
mod retry;

pub use anthropic::AnthropicClient;
pub use mock::MockCompletion;
pub use openai::OpenAiClient;
pub use retry::{RetryPolicy, RetryingCompletion};

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One completion call: a system instruction plus a single user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System-level instruction; empty means none
    pub instruction: String,

    /// User message body
    pub user_content: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Output token ceiling
    pub max_output_tokens: u32,
}

/// Generated text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
}

/// Trait for text generation
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one completion; transport, quota and decoding failures are errors
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Provider name for logs and metrics
    fn provider(&self) -> &str;
}

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        (**self).complete(request).await
    }

    fn provider(&self) -> &str {
        (**self).provider()
    }
}

/// Which backend `create_completion_service` should build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Mock,
}

impl Provider {
    /// Resolve the configured provider. `auto` prefers Anthropic, then
    /// OpenAI, then the mock when no key is present at all.
    pub fn resolve(config: &LlmConfig) -> Result<Self> {
        let has_anthropic = config.anthropic_api_key.as_deref().is_some_and(|k| !k.is_empty());
        let has_openai = config.openai_api_key.as_deref().is_some_and(|k| !k.is_empty());

        match config.provider.to_ascii_lowercase().as_str() {
            "auto" if has_anthropic => Ok(Provider::Anthropic),
            "auto" if has_openai => Ok(Provider::OpenAi),
            "auto" | "mock" => Ok(Provider::Mock),
            "anthropic" if has_anthropic => Ok(Provider::Anthropic),
            "openai" if has_openai => Ok(Provider::OpenAi),
            "anthropic" | "openai" => Err(AppError::Configuration {
                message: format!("llm.provider = {} but no API key is configured", config.provider),
            }),
            other => Err(AppError::Configuration {
                message: format!("Unknown completion provider: {}", other),
            }),
        }
    }
}

/// Create a completion service based on configuration, wrapped in the
/// retry policy when `llm.max_retries > 0`
pub fn create_completion_service(config: &LlmConfig) -> Result<Arc<dyn CompletionService>> {
    let provider = Provider::resolve(config)?;

    let base: Arc<dyn CompletionService> = match provider {
        Provider::Anthropic => Arc::new(AnthropicClient::new(
            config.anthropic_api_key.clone().unwrap_or_default(),
            config.anthropic_model.clone(),
            config.anthropic_base_url.clone(),
            config.timeout(),
        )?),
        Provider::OpenAi => Arc::new(OpenAiClient::new(
            config.openai_api_key.clone().unwrap_or_default(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
            config.timeout(),
        )?),
        Provider::Mock => {
            tracing::warn!("No completion API key configured, using mock completion service");
            Arc::new(MockCompletion::new())
        }
    };

    tracing::info!(provider = base.provider(), max_retries = config.max_retries, "Completion service ready");

    if config.max_retries == 0 {
        return Ok(base);
    }

    let policy = RetryPolicy {
        max_retries: config.max_retries,
        initial_backoff: Duration::from_millis(config.retry_initial_backoff_ms),
        max_backoff: Duration::from_millis(config.retry_max_backoff_ms),
    };
    Ok(Arc::new(RetryingCompletion::new(base, policy)))
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}
