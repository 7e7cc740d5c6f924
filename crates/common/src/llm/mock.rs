//! Scripted completion service for tests and offline development

use super::{Completion, CompletionRequest, CompletionService};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

const PROVIDER: &str = "mock";

/// Reply used once the script is exhausted
pub const OFFLINE_RESPONSE: &str =
    "No completion provider is configured, so this answer was not generated. [Mock response]";

enum Scripted {
    Text(String),
    Failure(String),
}

/// Completion service that replays a queue of scripted replies and records
/// every request it receives
#[derive(Default)]
pub struct MockCompletion {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    /// Create a mock with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push(Scripted::Text(text.into()));
        self
    }

    /// Queue a failed call
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Failure(message.into()));
        self
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far
    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn push(&self, item: Scripted) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Scripted::Text(text)) => Ok(Completion { text }),
            Some(Scripted::Failure(message)) => Err(AppError::completion(PROVIDER, message)),
            None => Ok(Completion {
                text: OFFLINE_RESPONSE.to_string(),
            }),
        }
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: &str) -> CompletionRequest {
        CompletionRequest {
            instruction: String::new(),
            user_content: content.to_string(),
            temperature: 0.1,
            max_output_tokens: 200,
        }
    }

    #[test]
    fn test_script_replayed_in_order() {
        let mock = MockCompletion::new()
            .with_response("first")
            .with_failure("quota exceeded")
            .with_response("second");

        tokio_test::block_on(async {
            assert_eq!(mock.complete(&request("a")).await.unwrap().text, "first");
            assert!(mock.complete(&request("b")).await.is_err());
            assert_eq!(mock.complete(&request("c")).await.unwrap().text, "second");
            assert_eq!(mock.complete(&request("d")).await.unwrap().text, OFFLINE_RESPONSE);
        });

        let seen: Vec<_> = mock.requests().into_iter().map(|r| r.user_content).collect();
        assert_eq!(seen, vec!["a", "b", "c", "d"]);
        assert_eq!(mock.calls(), 4);
    }
}
