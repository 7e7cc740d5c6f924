//! OpenAI Chat Completions client (also works against compatible endpoints)

use super::{http_client, Completion, CompletionRequest, CompletionService};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "openai";

/// OpenAI completion client
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if !request.instruction.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.instruction,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_content,
        });

        ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| AppError::completion(PROVIDER, format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::completion(PROVIDER, format!("API error {}: {}", status, body)));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::completion(PROVIDER, format!("Failed to parse response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| Completion {
                text: c.message.content.unwrap_or_default(),
            })
            .ok_or_else(|| AppError::completion(PROVIDER, "Empty response from LLM"))
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}
