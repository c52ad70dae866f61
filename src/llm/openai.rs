//! `OpenAI`-compatible chat completions client
//!
//! Works against any endpoint speaking the chat/completions wire format
//! (`OpenAI`, Perplexity, local gateways). The model is chosen per request.

use super::types::{Completion, CompletionRequest, Usage};
use super::{CompletionService, LlmError};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on any single HTTP exchange; per-request deadlines are tighter
const CLIENT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct OpenAiCompatibleService {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiCompatibleService {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    pub(super) fn translate_request(request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }

    pub(super) fn normalize_response(resp: ChatResponse) -> Result<Completion, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let text = choice
            .message
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::unknown("Empty completion content"))?;

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u64::from(u.prompt_tokens),
            output_tokens: u64::from(u.completion_tokens),
        });

        Ok(Completion { text, usage })
    }

    pub(super) fn classify_failure(status: u16, body: &str, retry_after: Option<Duration>) -> LlmError {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map_or_else(|_| body.to_string(), |resp| resp.error.message);
        let error = LlmError::from_status(status, format!("HTTP {status}: {message}"));
        match retry_after {
            Some(delay) => error.with_retry_after(delay),
            None => error,
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatibleService {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let body = Self::translate_request(request);

        let mut builder = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::timeout(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                LlmError::network(format!("Connection failed: {e}"))
            } else {
                LlmError::network(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_failure(status.as_u16(), &text, retry_after));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e}")))?;

        Self::normalize_response(parsed)
    }

    fn provider(&self) -> &str {
        "openai-compatible"
    }
}

// Wire types

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest {
    pub(super) model: String,
    pub(super) messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct ChatMessage {
    pub(super) role: String,
    pub(super) content: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
