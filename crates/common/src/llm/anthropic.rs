//! Anthropic Messages API client

use super::{http_client, Completion, CompletionRequest, CompletionService};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

/// Anthropic completion client
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            system: Some(request.instruction.as_str()).filter(|s| !s.is_empty()),
            messages: [Message {
                role: "user",
                content: &request.user_content,
            }],
        }
    }
}

#[async_trait]
impl CompletionService for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = format!("{}/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| AppError::completion(PROVIDER, format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::completion(PROVIDER, format!("API error {}: {}", status, body)));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::completion(PROVIDER, format!("Failed to parse response: {}", e)))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        Ok(Completion { text })
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}
