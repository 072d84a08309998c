//! Language model integrations for the agent loop.
//!
//! The agent only sees the narrow [`LanguageModel`] trait: given the
//! transcript and the registered tools, return the next [`Action`]. Tests
//! plug in scripted implementations; [`LlmClient`] talks to a hosted model.
//!
//! # Supported Providers
//!
//! | Provider | Endpoint | Authentication | Tool calling |
//! |----------|----------|----------------|--------------|
//! | OpenAI | `api.openai.com/v1/chat/completions` | Bearer token | `tools` / `tool_calls` |
//! | Anthropic | `api.anthropic.com/v1/messages` | x-api-key header | `tool_use` / `tool_result` blocks |
//! | Ollama | Local `/api/chat` (configurable) | None | `tools` / `tool_calls` |
//!
//! Only the first tool call of a response is honored: the loop runs tools
//! strictly one at a time.
//!
//! # Retry Behavior
//!
//! The client automatically retries on transient errors:
//! - Connection timeouts
//! - Rate limiting (429)
//! - Server errors (5xx)
//!
//! Retry delays use exponential backoff with configurable parameters.
//!
//! # Example
//!
//! ```
//! use sales_assistant::{
//!     config::{LlmConfig, RetryConfig},
//!     llm::{LlmClient, LlmProvider}
//! };
//!
//! let provider = LlmProvider::Ollama {
//!     base_url: "http://localhost:11434".into(),
//!     model:    "llama3.2".into()
//! };
//!
//! let client = LlmClient::new(provider, &LlmConfig::default(), RetryConfig::default());
//! ```

pub mod anthropic;
pub mod ollama;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    agent::{Action, Transcript},
    config::{LlmConfig, RetryConfig},
    error::{AppError, AppResult, http_error, llm_api_error},
    tools::ToolSpec
};

/// Source of the agent's next action
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, transcript: &Transcript, tools: &[ToolSpec]) -> AppResult<Action>;
}

/// LLM provider configuration with authentication credentials.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// OpenAI API (GPT-4o, GPT-4.1, etc.)
    OpenAI {
        /// API key (sk-...)
        api_key: String,
        /// Model identifier (e.g., "gpt-4o")
        model:   String
    },
    /// Anthropic API (Claude models)
    Anthropic {
        /// API key
        api_key: String,
        /// Model identifier (e.g., "claude-sonnet-4-20250514")
        model:   String
    },
    /// Local Ollama instance
    Ollama {
        /// Base URL (e.g., "http://localhost:11434")
        base_url: String,
        /// Model name (e.g., "llama3.2", "qwen2.5")
        model:    String
    }
}

impl LlmProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAI {
                ..
            } => "OpenAI",
            Self::Anthropic {
                ..
            } => "Anthropic",
            Self::Ollama {
                ..
            } => "Ollama"
        }
    }
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens:  u32
}

/// HTTP client for LLM API communication with retry support.
///
/// Handles provider-specific request formatting and response parsing.
/// Automatically retries transient failures with exponential backoff.
pub struct LlmClient {
    provider:     LlmProvider,
    client:       reqwest::Client,
    retry_config: RetryConfig,
    settings:     GenerationSettings
}

impl LlmClient {
    /// Create new LLM client
    pub fn new(provider: LlmProvider, config: &LlmConfig, retry_config: RetryConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            provider,
            client,
            retry_config,
            settings: GenerationSettings {
                temperature: config.temperature,
                max_tokens:  config.max_tokens
            }
        }
    }

    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }

    async fn call_with_retry(
        &self,
        transcript: &Transcript,
        tools: &[ToolSpec]
    ) -> AppResult<Action> {
        let mut last_error = None;
        let mut delay = self.retry_config.initial_delay_ms;
        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                warn!(
                    attempt = attempt + 1,
                    max_attempts = self.retry_config.max_retries + 1,
                    delay_ms = delay,
                    "retrying LLM request"
                );
                sleep(Duration::from_millis(delay)).await;
                delay = ((delay as f64 * self.retry_config.backoff_factor) as u64)
                    .min(self.retry_config.max_delay_ms);
            }
            match self.call_provider(transcript, tools).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if is_retryable_error(&e) {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| llm_api_error("All retry attempts failed")))
    }

    async fn call_provider(
        &self,
        transcript: &Transcript,
        tools: &[ToolSpec]
    ) -> AppResult<Action> {
        debug!(provider = self.provider.name(), turns = transcript.turns.len(), "calling model");
        match &self.provider {
            LlmProvider::OpenAI {
                api_key,
                model
            } => {
                let request = openai::build_request(model, self.settings, transcript, tools);
                let builder = self
                    .client
                    .post("https://api.openai.com/v1/chat/completions")
                    .header("Authorization", format!("Bearer {}", api_key))
                    .json(&request);
                let response: openai::ChatResponse = self.send(builder, "OpenAI").await?;
                openai::parse_response(response)
            }
            LlmProvider::Anthropic {
                api_key,
                model
            } => {
                let request = anthropic::build_request(model, self.settings, transcript, tools);
                let builder = self
                    .client
                    .post("https://api.anthropic.com/v1/messages")
                    .header("x-api-key", api_key)
                    .header("anthropic-version", "2023-06-01")
                    .json(&request);
                let response: anthropic::MessagesResponse = self.send(builder, "Anthropic").await?;
                anthropic::parse_response(response)
            }
            LlmProvider::Ollama {
                base_url,
                model
            } => {
                let request = ollama::build_request(model, self.settings, transcript, tools);
                let url = format!("{}/api/chat", base_url.trim_end_matches('/'));
                let builder = self.client.post(&url).json(&request);
                let response: ollama::ChatResponse = self.send(builder, "Ollama").await?;
                ollama::parse_response(response, transcript)
            }
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        provider: &str
    ) -> AppResult<T> {
        let response = builder.send().await.map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "{} API error {}: {}",
                provider, status, text
            )));
        }
        response.json().await.map_err(http_error)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate(&self, transcript: &Transcript, tools: &[ToolSpec]) -> AppResult<Action> {
        self.call_with_retry(transcript, tools).await
    }
}

fn is_retryable_error(error: &AppError) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("timeout")
        || msg.contains("connection")
        || msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("504")
}

/// Parse tool arguments sent as a JSON string, keeping raw text otherwise
fn parse_arguments(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
