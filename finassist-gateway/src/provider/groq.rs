//! Groq chat-completion provider (OpenAI-compatible wire format).

use super::{ChatCompleter, CompletionError, Message, Role};
use async_trait::async_trait;
use finassist_common::config::{LlmConfig, API_KEY_ENV};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Groq API provider.
pub struct GroqProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    system_prompt: String,
}

impl GroqProvider {
    /// Create a provider with default model settings.
    pub fn new(api_key: Option<String>) -> Self {
        Self::from_config(&LlmConfig::default(), api_key)
    }

    /// Create a provider from LLM settings and an optional credential.
    pub fn from_config(llm: &LlmConfig, api_key: Option<String>) -> Self {
        Self {
            client: build_client(Duration::from_secs(llm.timeout_secs)),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            system_prompt: llm.system_prompt.clone(),
        }
    }

    /// Override the API root (mock servers, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the whole-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// System prompt first, then the caller's history in order.
    fn build_request<'a>(&'a self, history: &'a [Message]) -> GroqRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(GroqMessage {
            role: Role::System,
            content: &self.system_prompt,
        });
        messages.extend(history.iter().map(|m| GroqMessage {
            role: m.role,
            content: &m.content,
        }));

        GroqRequest {
            messages,
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[async_trait]
impl ChatCompleter for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, history: &[Message]) -> Result<String, CompletionError> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("{} is not configured", API_KEY_ENV);
            return Err(CompletionError::Configuration(API_KEY_ENV.into()));
        };

        let start = Instant::now();
        let request = self.build_request(history);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, timeout = e.is_timeout(), "Request error");
                CompletionError::Connectivity(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "HTTP error from Groq API");
            return Err(CompletionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        // A stall or reset mid-body is a transport failure, not a bad payload.
        let body = response.bytes().await.map_err(|e| {
            tracing::error!(error = %e, timeout = e.is_timeout(), "Failed to read Groq API response");
            CompletionError::Connectivity(e.to_string())
        })?;

        let groq_response: GroqResponse = serde_json::from_slice(&body).map_err(|e| {
            tracing::error!(error = %e, "Unexpected response from Groq API");
            CompletionError::Internal(format!("Failed to parse response: {}", e))
        })?;

        let content = groq_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                tracing::error!("Groq API returned no message content");
                CompletionError::Internal("Response contained no choices".into())
            })?;

        tracing::debug!(
            model = %self.model,
            history_len = history.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Completion received"
        );

        Ok(content)
    }
}

// ============================================================================
// Groq API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GroqRequest<'a> {
    messages: Vec<GroqMessage<'a>>,
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GroqMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
