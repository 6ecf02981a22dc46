//! Deterministic stand-ins for the model-backed services

use crate::db::VectorStore;
use crate::error::{GenerationError, Result};
use crate::llm::{Embedder, Generator};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod keywords;

pub use keywords::{keyword_vector, KEYWORD_DIMS, KEYWORD_MODEL, SCROLLS};

/// Embeds text with [`keyword_vector`]
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(keyword_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        KEYWORD_DIMS
    }

    fn model_name(&self) -> &str {
        KEYWORD_MODEL
    }
}

/// Embedder that never answers within any reasonable deadline
pub struct SlowEmbedder {
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Embedder for SlowEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![vec![1.0, 0.0]; texts.len()])
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model_name(&self) -> &str {
        "slow-test"
    }
}

/// Generator that records prompts and replies from a script
pub struct ScriptedGenerator {
    reply: std::result::Result<String, GenerationError>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            reply: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(Into::into)
    }

    fn model_name(&self) -> &str {
        "scripted-test"
    }
}

/// In-memory store holding every scroll, embedded with `embedder`
pub async fn seeded_store(embedder: &dyn Embedder) -> Arc<VectorStore> {
    let store =
        VectorStore::open_in_memory("occultum", embedder.model_name(), embedder.dimensions())
            .unwrap();
    for (id, text) in SCROLLS {
        let embedding = embedder.embed(text).await.unwrap();
        store.upsert(id, text, &embedding).unwrap();
    }
    Arc::new(store)
}
