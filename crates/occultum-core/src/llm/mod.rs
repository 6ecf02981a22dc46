//! LLM integration
//!
//! Provides traits and implementations for:
//! - Embedding generation via an external service or in-process ONNX inference
//! - Chat completion against OpenAI-compatible endpoints, with bounded retry

mod cache;
mod client;
#[cfg(feature = "fastembed")]
mod fastembed_embedder;
mod http_embedder;
pub mod retry;
mod traits;

pub use cache::EmbeddingCache;
pub use client::{ChatClient, ChatMessage, MetricsSnapshot};
#[cfg(feature = "fastembed")]
pub use fastembed_embedder::{FastEmbedder, DEFAULT_FASTEMBED_MODEL};
pub use http_embedder::HttpEmbedder;
pub use retry::RetryPolicy;
pub use traits::*;

use crate::config::{Config, EmbeddingBackend};
use crate::error::{OccultumError, Result};
use std::sync::Arc;

/// Construct the configured embedding backend
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding.backend {
        EmbeddingBackend::Http => Ok(Arc::new(HttpEmbedder::from_config(config)?)),
        #[cfg(feature = "fastembed")]
        EmbeddingBackend::Fastembed => {
            let cache_dir = dirs::cache_dir().map(|d| d.join(crate::CACHE_DIR_NAME).join("models"));
            let embedder = FastEmbedder::new(&config.embedding.model, cache_dir)?;
            if embedder.dimensions() != config.embedding.dimensions {
                return Err(OccultumError::DimensionMismatch {
                    expected: config.embedding.dimensions,
                    actual: embedder.dimensions(),
                });
            }
            Ok(Arc::new(embedder))
        }
        #[cfg(not(feature = "fastembed"))]
        EmbeddingBackend::Fastembed => Err(OccultumError::Config(
            "the fastembed backend requires building with `--features fastembed`".to_string(),
        )),
    }
}
