//! HTTP client for OpenAI-compatible chat completion services

use super::retry::{self, RetryPolicy};
use super::Generator;
use crate::config::GenerationConfig;
use crate::error::{GenerationError, OccultumError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest slice of an upstream error body kept in messages
const MAX_ERROR_BODY: usize = 500;

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct ApiMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub total_retries: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub total_retries: u64,
    pub avg_latency_ms: f64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of one failed attempt
enum Failure {
    Transient {
        error: GenerationError,
        retry_after: Option<Duration>,
    },
    Fatal(GenerationError),
}

impl Failure {
    fn transient(error: GenerationError) -> Self {
        Self::Transient {
            error,
            retry_after: None,
        }
    }

    fn into_error(self) -> GenerationError {
        match self {
            Self::Transient { error, .. } | Self::Fatal(error) => error,
        }
    }
}

/// OpenAI-compatible chat completion client
pub struct ChatClient {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    retry: RetryPolicy,
    metrics: Arc<ApiMetrics>,
}

impl ChatClient {
    /// Create client from configuration; an API key is required
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                OccultumError::Config(
                    "no API key configured (set OCCULTUM_API_KEY or generation.api_key)"
                        .to_string(),
                )
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| OccultumError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url: format!(
                "{}/v1/chat/completions",
                config.url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            api_key,
            retry: RetryPolicy::from_config(config),
            metrics: Arc::new(ApiMetrics::default()),
        })
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        let total = self.metrics.total_requests.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            total_retries: self.metrics.total_retries.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Generate chat completion, retrying transient failures
    pub async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let mut attempt = 1;
        let result = loop {
            match self.send_once(&request).await {
                Ok(content) => break Ok(content),
                Err(Failure::Transient { error, retry_after }) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay(attempt, retry_after);
                    tracing::warn!(
                        "Generation attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        self.retry.max_attempts,
                        error,
                        delay
                    );
                    self.metrics.total_retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => break Err(failure.into_error()),
            }
        };

        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);

        let result = result.map_err(|error| {
            self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
            OccultumError::Generation(error)
        });

        let totals = self.metrics();
        tracing::debug!(
            "Generation took {} ms over {} attempt(s) (totals: {} requests, {} retries, {} errors, {:.0} ms avg)",
            elapsed,
            attempt,
            totals.total_requests,
            totals.total_retries,
            totals.total_errors,
            totals.avg_latency_ms
        );
        result
    }

    async fn send_once(&self, request: &ChatRequest<'_>) -> std::result::Result<String, Failure> {
        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry::retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            let error = GenerationError::new(Some(status.as_u16()), upstream_message(&body));
            return Err(if retry::is_transient_status(status.as_u16()) {
                Failure::Transient { error, retry_after }
            } else {
                Failure::Fatal(error)
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            let error =
                GenerationError::new(Some(status.as_u16()), format!("malformed response: {}", e));
            if e.is_timeout() {
                Failure::transient(error)
            } else {
                Failure::Fatal(error)
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                Failure::Fatal(GenerationError::new(
                    Some(status.as_u16()),
                    "malformed response: no completion choices",
                ))
            })?
            .message
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                Failure::Fatal(GenerationError::new(
                    Some(status.as_u16()),
                    "malformed response: completion has no content",
                ))
            })?;

        Ok(content)
    }
}

#[async_trait]
impl Generator for ChatClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!("Requesting completion from {} ({} chars)", self.model, prompt.len());
        self.chat_completion(&[ChatMessage::user(prompt)]).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn classify_send_error(e: reqwest::Error) -> Failure {
    let error = GenerationError::new(e.status().map(|s| s.as_u16()), e.to_string());
    if e.is_timeout() || e.is_connect() || e.is_request() {
        Failure::transient(error)
    } else {
        Failure::Fatal(error)
    }
}

/// Pull the human-readable message out of an error body
fn upstream_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: Option<serde_json::Value>,
        detail: Option<serde_json::Value>,
        message: Option<String>,
    }

    let from_json = serde_json::from_str::<Envelope>(body).ok().and_then(|env| {
        let nested = env.error.and_then(|err| match err {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            _ => None,
        });
        nested
            .or_else(|| env.detail.map(|d| d.as_str().map(str::to_string).unwrap_or_else(|| d.to_string())))
            .or(env.message)
    });

    match from_json {
        Some(message) => message,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.chars().take(MAX_ERROR_BODY).collect(),
    }
}
