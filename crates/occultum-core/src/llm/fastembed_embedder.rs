//! In-process embedder backed by fastembed (ONNX Runtime)

use super::Embedder;
use crate::error::{OccultumError, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, TextEmbedding, TextInitOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Default embedding model (BERT-based, 384 dimensions)
pub const DEFAULT_FASTEMBED_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Local sentence-transformers embedder
///
/// The ONNX session is shared behind a mutex and driven from the blocking
/// thread pool so inference never stalls the async runtime.
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimensions: usize,
}

impl FastEmbedder {
    /// Load `model_name`, downloading weights into `cache_dir` on first use
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self> {
        let (model, dimensions) = resolve_model(model_name)?;

        let mut options = TextInitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let embedding = TextEmbedding::try_new(options).map_err(|e| {
            OccultumError::ModelUnavailable(format!("failed to load {}: {}", model_name, e))
        })?;

        tracing::info!("Model loaded: {} ({} dims)", model_name, dimensions);

        Ok(Self {
            model: Arc::new(Mutex::new(embedding)),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| OccultumError::ModelUnavailable("model lock poisoned".to_string()))?;
            guard
                .embed(texts, None)
                .map_err(|e| OccultumError::ModelUnavailable(format!("inference failed: {}", e)))
        })
        .await
        .map_err(|e| OccultumError::ModelUnavailable(format!("inference task failed: {}", e)))?
    }
}

fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize)> {
    match name {
        "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
            Ok((EmbeddingModel::AllMiniLML6V2, 384))
        }
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
        other => Err(OccultumError::ModelUnavailable(format!(
            "model '{}' is not available for local inference",
            other
        ))),
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OccultumError::ModelUnavailable("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run(texts.to_vec()).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
