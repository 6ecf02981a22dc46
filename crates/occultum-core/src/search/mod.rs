//! Retrieval
//!
//! Embeds a query once and asks the vector store for its nearest passages.

use crate::config::Config;
use crate::db::{ScoredDocument, VectorStore};
use crate::error::{OccultumError, Result};
use crate::llm::{build_embedder, Embedder};
use std::sync::Arc;
use std::time::Duration;

/// Default deadline for the query embedding call
const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Embedding provider + vector store
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
    min_score: Option<f32>,
    embed_timeout: Duration,
}

impl Retriever {
    /// Pair an embedder with a store; both must agree on model and dimensions
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<VectorStore>) -> Result<Self> {
        let collection = store.collection();
        if embedder.model_name() != collection.model {
            return Err(OccultumError::EmbeddingModelMismatch {
                collection: collection.name.clone(),
                stored: collection.model.clone(),
                configured: embedder.model_name().to_string(),
            });
        }
        if embedder.dimensions() != collection.dimensions {
            return Err(OccultumError::DimensionMismatch {
                expected: collection.dimensions,
                actual: embedder.dimensions(),
            });
        }

        Ok(Self {
            embedder,
            store,
            min_score: None,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        })
    }

    /// Build the configured embedder and open the configured collection
    ///
    /// The collection must already exist; retrieval never creates one.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(VectorStore::existing_from_config(config)?);
        let embedder = build_embedder(config)?;
        Ok(Self::new(embedder, store)?
            .with_min_score(config.retrieval.min_score)
            .with_timeout(config.embedding.timeout()))
    }

    /// Drop results scoring below `min_score`
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    /// Deadline for embedding the query
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    /// Top-`k` passages with their ids and cosine scores, best first
    pub async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        let embedding = tokio::time::timeout(self.embed_timeout, self.embedder.embed(query))
            .await
            .map_err(|_| OccultumError::Timeout {
                operation: "query embedding",
                after: self.embed_timeout,
            })??;

        let mut results = self.store.query(&embedding, k)?;
        if let Some(min_score) = self.min_score {
            let before = results.len();
            results.retain(|r| r.score >= min_score);
            if results.len() < before {
                tracing::debug!(
                    "Dropped {} passages below min score {}",
                    before - results.len(),
                    min_score
                );
            }
        }

        tracing::debug!(
            "Retrieved {} passages (scores: {:?})",
            results.len(),
            results.iter().map(|r| r.score).collect::<Vec<_>>()
        );
        Ok(results)
    }

    /// Top-`k` passage texts, best first
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .retrieve_scored(query, k)
            .await?
            .into_iter()
            .map(|r| r.text)
            .collect())
    }
}
