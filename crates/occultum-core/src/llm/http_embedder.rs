//! HTTP-based embedder using an OpenAI-compatible `/v1/embeddings` service

use super::cache::EmbeddingCache;
use super::Embedder;
use crate::config::Config;
use crate::error::{OccultumError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sub-batches in flight at once
const MAX_CONCURRENT_BATCHES: usize = 4;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Embedder that uses an external HTTP service (TEI, vLLM, OpenAI, etc.)
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
    batch_size: usize,
    timeout: Duration,
    cache: Option<EmbeddingCache>,
}

impl HttpEmbedder {
    /// Create from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedding = &config.embedding;
        let http_client = reqwest::Client::builder()
            .timeout(embedding.timeout())
            .build()
            .map_err(|e| OccultumError::ModelUnavailable(format!("cannot build HTTP client: {}", e)))?;

        let cache = (embedding.cache_ttl_secs > 0)
            .then(|| EmbeddingCache::new(Duration::from_secs(embedding.cache_ttl_secs)));

        Ok(Self {
            http_client,
            url: format!("{}/v1/embeddings", config.embeddings_url().trim_end_matches('/')),
            model: embedding.model.clone(),
            api_key: config.embeddings_api_key().map(str::to_string),
            dimensions: embedding.dimensions,
            batch_size: embedding.batch_size.max(1),
            timeout: embedding.timeout(),
            cache,
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut req = self.http_client.post(&self.url).json(&EmbedRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(ref api_key) = self.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().await.map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OccultumError::ModelUnavailable(format!(
                "embedding service error (HTTP {}): {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        let mut parsed: EmbedResponse = response.json().await.map_err(|e| self.transport_error(e))?;

        if parsed.data.len() != texts.len() {
            return Err(OccultumError::ModelUnavailable(format!(
                "embedding service returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        if parsed.data.iter().all(|d| d.index.is_some()) {
            parsed.data.sort_by_key(|d| d.index);
        }

        parsed
            .data
            .into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimensions {
                    Ok(d.embedding)
                } else {
                    Err(OccultumError::DimensionMismatch {
                        expected: self.dimensions,
                        actual: d.embedding.len(),
                    })
                }
            })
            .collect()
    }

    fn transport_error(&self, e: reqwest::Error) -> OccultumError {
        if e.is_timeout() {
            OccultumError::Timeout {
                operation: "embedding request",
                after: self.timeout,
            }
        } else {
            OccultumError::ModelUnavailable(format!("embedding service unreachable: {}", e))
        }
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(text)) {
            tracing::debug!("Query embedding served from cache");
            return Ok(cached);
        }

        let embedding = self
            .request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OccultumError::ModelUnavailable("no embedding returned".to_string()))?;

        if let Some(ref cache) = self.cache {
            cache.set(text.to_string(), embedding.clone());
        }
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let chunks: Vec<_> = texts.chunks(self.batch_size).collect();
        tracing::debug!(
            "Embedding {} texts in {} batches",
            texts.len(),
            chunks.len()
        );

        // futures are built up front; `buffered` yields in submission order
        let requests: Vec<_> = chunks.into_iter().map(|chunk| self.request(chunk)).collect();
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(requests)
            .buffered(MAX_CONCURRENT_BATCHES)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
