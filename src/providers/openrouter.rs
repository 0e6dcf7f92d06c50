use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::errors::ProviderError;
use crate::language_utils::Level;
use crate::translation::prompts::{TranslationPromptBuilder, max_tokens_for};

use super::Provider;

/// Default chat completions endpoint
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model
pub const DEFAULT_MODEL: &str = "google/gemma-3-27b-it:free";

/// How 429 responses are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry when the server gives no Retry-After
    pub initial_backoff: Duration,
    /// Upper bound of any wait, server-given or computed
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Computed wait before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Wait before retry number `retry`, preferring the server's `Retry-After`
    pub fn wait(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map(|wait| wait.min(self.max_backoff))
            .unwrap_or_else(|| self.backoff(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Connection and request settings for [`OpenRouter`]
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    /// Full chat completions URL
    pub endpoint: String,
    /// Bearer token
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Per-call timeout
    pub timeout: Duration,
    /// Upper bound of in-flight requests
    pub max_connections: usize,
    /// Upper bound of idle pooled connections
    pub max_keepalive: usize,
    /// 429 handling
    pub retry: RetryPolicy,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            max_connections: 20,
            max_keepalive: 10,
            retry: RetryPolicy::default(),
        }
    }
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat completions request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Create a deterministic request for the given model
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            temperature: 0.0,
            top_p: 0.1,
            messages: Vec::new(),
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }
}

/// One completion choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Chat completions response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    /// Text of the first choice
    pub fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
    }
}

/// Parse a `Retry-After` header given in whole seconds
pub fn parse_retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Client for an OpenAI-compatible chat completions endpoint
#[derive(Debug)]
pub struct OpenRouter {
    client: Client,
    config: OpenRouterConfig,
    /// Caps in-flight requests at `max_connections`
    connections: Arc<Semaphore>,
}

impl OpenRouter {
    /// Create a new client with its own connection pool
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_keepalive)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            connections: Arc::new(Semaphore::new(config.max_connections.max(1))),
            config,
        })
    }

    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    /// Send a request, retrying on 429 per the retry policy
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let policy = self.config.retry;
        let mut retries = 0;

        loop {
            let permit = self
                .connections
                .acquire()
                .await
                .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

            let response = self
                .client
                .post(&self.config.endpoint)
                .bearer_auth(&self.config.api_key)
                .json(request)
                .send()
                .await
                .map_err(|e| {
                    error!("Upstream request failed: {}", e);
                    ProviderError::ConnectionError(e.to_string())
                })?;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = parse_retry_after(response.headers());
                drop(permit);

                if retries >= policy.max_retries {
                    error!("Upstream still rate limited after {} retries", retries);
                    return Err(ProviderError::RateLimitExceeded(format!(
                        "still rate limited after {} retries",
                        retries
                    )));
                }

                let wait = policy.wait(retries, retry_after);
                retries += 1;
                warn!(
                    "Upstream rate limited, retry {}/{} in {:?}",
                    retries, policy.max_retries, wait
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;
            drop(permit);

            if !status.is_success() {
                error!("Upstream API error ({}): {}", status, body);
                return Err(ProviderError::ApiError {
                    status_code: status.as_u16(),
                    message: body,
                });
            }

            return serde_json::from_str::<ChatResponse>(&body).map_err(|e| {
                error!("Failed to parse upstream response: {}", e);
                ProviderError::ParseError(e.to_string())
            });
        }
    }
}

#[async_trait]
impl Provider for OpenRouter {
    async fn translate(
        &self,
        chunk: &str,
        source_lang: &str,
        target_lang: &str,
        level: Option<Level>,
    ) -> Result<String, ProviderError> {
        let (system, user) = TranslationPromptBuilder::new(source_lang, target_lang)
            .with_level(level)
            .build(chunk);

        let request = ChatRequest::new(&self.config.model, max_tokens_for(chunk))
            .add_message("system", system)
            .add_message("user", user);

        debug!("Translating {} chars {} -> {}", chunk.chars().count(), source_lang, target_lang);

        self.complete(&request)
            .await?
            .into_text()
            .ok_or_else(|| ProviderError::ParseError("response contained no choices".to_string()))
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}
