#[cfg(test)]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use backoff::{Error as BackoffError, ExponentialBackoff, future::retry};
use mockall::automock;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Token limit for the outline request.
pub const OUTLINE_MAX_TOKENS: u32 = 1000;
/// Token limit for one core sub-part.
pub const SUBPART_MAX_TOKENS: u32 = 3000;
/// Token limit for one addon call.
pub const ADDON_MAX_TOKENS: u32 = 500;
/// Token limit for a chat reply.
pub const CHAT_MAX_TOKENS: u32 = 500;
/// Number of messages of chat history kept per user.
pub const CHAT_HISTORY_LIMIT: usize = 10;

/// Errors from the chat completions API.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The API key cannot be sent as a header.
    #[error("Invalid API key header: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    /// The request could not be sent.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("LLM API returned {status}: {body}")]
    Api {
        /// HTTP status of the response.
        status: StatusCode,
        /// Response body.
        body: String,
    },

    /// The API answered without choices.
    #[error("LLM API returned no choices")]
    EmptyResponse,
}

/// Result of an LLM call.
pub type LlmResult<T> = Result<T, LlmError>;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The user.
    User,
    /// The model.
    Assistant,
}

/// One message of a chat completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A message written by the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// A message written by the model.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Drops the oldest messages so that at most `CHAT_HISTORY_LIMIT` remain.
pub fn trim_history(history: &mut Vec<ChatMessage>) {
    if history.len() > CHAT_HISTORY_LIMIT {
        history.drain(..history.len() - CHAT_HISTORY_LIMIT);
    }
}

/// Chat completions client.
#[automock]
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends the conversation and returns the assistant's reply.
    async fn complete(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> LlmResult<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

impl CompletionResponse {
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().map(|choice| choice.message.content)
    }
}

/// Client for an OpenAI compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_url: String,
    model: String,
}

impl OpenAiClient {
    /// Creates a client with bearer auth for `api_key`.
    pub fn new(api_key: &str, api_url: &str, model: &str) -> LlmResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {api_key}"))?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()?;
        debug!("LLM HTTP client built successfully.");

        Ok(Self { client, api_url: api_url.to_string(), model: model.to_string() })
    }

    fn backoff_config() -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Some(Duration::from_secs(120)),
            multiplier: 2.0,
            ..Default::default()
        }
    }
}

/// Rate limiting and server errors are worth another attempt.
fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: Vec<ChatMessage>, max_tokens: u32) -> LlmResult<String> {
        let request = CompletionRequest { model: &self.model, messages: &messages, max_tokens };

        let operation = || async {
            let resp = self.client.post(&self.api_url).json(&request).send().await.map_err(|e| {
                warn!("Network error sending completion request: {e}. Retrying...");
                BackoffError::transient(LlmError::Http(e))
            })?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                warn!("Non-success HTTP {status} from LLM API: {body}");
                let err = LlmError::Api { status, body };
                return Err(if is_transient_status(status) {
                    BackoffError::transient(err)
                } else {
                    BackoffError::permanent(err)
                });
            }

            let body: CompletionResponse = resp.json().await.map_err(|e| {
                warn!("Failed to parse completion JSON: {e}. Retrying...");
                BackoffError::transient(LlmError::Http(e))
            })?;

            body.into_text().ok_or_else(|| {
                error!("Completion response had no choices");
                BackoffError::permanent(LlmError::EmptyResponse)
            })
        };

        retry(Self::backoff_config(), operation).await
    }
}
