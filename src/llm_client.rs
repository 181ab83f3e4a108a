//! Chat-completion client for OpenAI-compatible services.

use crate::settings::LlmSettings;
use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standing instructions.
    System,
    /// Our side of the conversation.
    User,
    /// The model's replies.
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Speaker.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Something that turns a conversation into a reply.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Returns the reply text for `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Client for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    /// Creates a client from transport settings and a key.
    #[instrument(skip(api_key, settings), fields(base_url = %settings.base_url(), model = %settings.model()))]
    pub fn new(api_key: String, settings: &LlmSettings) -> Self {
        info!("Creating chat completions client");
        Self {
            http: reqwest::Client::new(),
            endpoint: format!(
                "{}/chat/completions",
                settings.base_url().trim_end_matches('/')
            ),
            api_key,
            model: settings.model().clone(),
            max_tokens: *settings.max_tokens(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
}

#[async_trait]
impl CompletionBackend for ChatCompletionsClient {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let request_body = CompletionRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages,
        };

        debug!(endpoint = %self.endpoint, "Sending chat completion request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::new(format!("Chat completion request failed: {}", e)))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::new(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            error!(status = %status, response = %response_text, "Chat completion API error");
            return Err(LlmError::new(format!(
                "Chat completion API error {}: {}",
                status, response_text
            )));
        }

        debug!(response_length = response_text.len(), "Parsing chat completion response");
        let response_json: serde_json::Value = serde_json::from_str(&response_text)
            .map_err(|e| LlmError::new(format!("Failed to parse response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::new("No content in chat completion response".to_string()))?
            .to_string();

        info!(content_length = content.len(), "Generated completion");
        Ok(content)
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

/// Backend used when no API key is configured. Every request fails at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingCredentials;

#[async_trait]
impl CompletionBackend for MissingCredentials {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
        Err(LlmError::new("OPENAI_KEY is not set".to_string()))
    }

    fn name(&self) -> &str {
        "missing-credentials"
    }
}

/// Picks the backend for the given transport settings.
pub fn backend_for(settings: &LlmSettings) -> Arc<dyn CompletionBackend> {
    match settings.api_key() {
        Some(key) => Arc::new(ChatCompletionsClient::new(key.clone(), settings)),
        None => {
            warn!("No API key configured, language-model decisions will fall back");
            Arc::new(MissingCredentials)
        }
    }
}

/// Completion service error: transport, credentials or response format.
#[derive(Debug, Clone, Display, Error)]
#[display("LLM error: {} at {}:{}", message, file, line)]
pub struct LlmError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl LlmError {
    /// Creates a new LLM error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        debug!(error_message = %message, "LLM error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("turn 1")];
        let body = serde_json::to_value(CompletionRequest {
            model: "gpt-4o-mini",
            max_tokens: 64,
            messages: &messages,
        })
        .unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "turn 1");
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let settings = LlmSettings::new(None, "http://localhost:9000/v1/", "m", 8);
        let client = ChatCompletionsClient::new("key".to_string(), &settings);
        assert_eq!(client.endpoint, "http://localhost:9000/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_fast() {
        let err = MissingCredentials.complete(&[]).await.unwrap_err();
        assert!(err.message.contains("OPENAI_KEY"));
    }
}
