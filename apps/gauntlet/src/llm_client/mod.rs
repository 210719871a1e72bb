/// LLM Client: the single point of entry for all Claude API calls in Gauntlet.
///
/// ARCHITECTURAL RULE: the review and synthesis phases never call the Anthropic
/// API directly. They depend on the `Generator` trait, which `LlmClient`
/// implements, so they can be driven by a scripted generator in tests.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod retry;

pub use retry::{with_retry, RetryPolicy};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Long syntheses can take several minutes to stream back.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },
}

impl LlmError {
    /// Transient failures worth another attempt: rate limits, overload,
    /// server errors, and transport timeouts or connection failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::Api { status, .. } => *status == 429 || (500..600).contains(status),
            LlmError::Http(e) => e.is_timeout() || e.is_connect(),
            LlmError::Parse(_) | LlmError::EmptyContent | LlmError::Exhausted { .. } => false,
        }
    }
}

/// One completion call: model, system instructions, user context, sampling
/// temperature and output token budget.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub instructions: &'a str,
    pub context: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Anything that can turn a `GenerationRequest` into text.
///
/// Implementations retry transient failures themselves; an `Err` returned here
/// is final for the unit of work that asked for it.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with the run's retry policy.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: String, retry: RetryPolicy) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            retry,
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Makes a call to the Claude API, returning the full response object.
    /// Transient failures are retried according to the client's `RetryPolicy`.
    pub async fn call(&self, request: GenerationRequest<'_>) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.instructions,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.context,
            }],
        };
        let body = &request_body;

        with_retry(&self.retry, |_| self.send_once(body)).await
    }

    async fn send_once(&self, body: &AnthropicRequest<'_>) -> Result<LlmResponse, LlmError> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited { message });
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let llm_response: LlmResponse = serde_json::from_str(&body)?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl Generator for LlmClient {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, LlmError> {
        let response = self.call(request).await?;
        extract_text(&response)
    }
}

/// Returns the response text, rejecting missing or blank completions.
fn extract_text(response: &LlmResponse) -> Result<String, LlmError> {
    match response.text() {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(LlmError::EmptyContent),
    }
}
