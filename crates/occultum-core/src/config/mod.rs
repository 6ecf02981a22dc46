//! Configuration management
//!
//! Configuration is resolved once at startup: built-in defaults, then the YAML
//! file (if present), then environment variables. The binary applies CLI flags
//! on top before handing the struct to the services.

use crate::error::{OccultumError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "OCCULTUM_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Remote text-generation endpoint
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// On-disk vector store
    #[serde(default)]
    pub store: StoreConfig,

    /// Retrieval and context assembly
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// OpenAI-compatible chat completion service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Base URL of the service (`/v1/chat/completions` is appended)
    #[serde(default = "default_generation_url")]
    pub url: String,

    /// Model identifier sent with every request
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Bearer API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Deadline for a single request attempt, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts per generation, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the first retry; doubled after each retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_generation_url(),
            model: default_generation_model(),
            api_key: None,
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

/// Which embedding backend to construct
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/v1/embeddings` service
    #[default]
    Http,
    /// In-process ONNX inference (requires the `fastembed` feature)
    Fastembed,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Base URL for the embeddings service (falls back to the generation URL)
    #[serde(default)]
    pub url: Option<String>,

    /// API key for the embeddings service (falls back to the generation key)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name; recorded on the collection and checked on every open
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector length produced by the model
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Deadline for one embedding call, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Lifetime of cached query embeddings; 0 disables the cache
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Texts per embeddings request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            url: None,
            api_key: None,
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            timeout_secs: default_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Vector store location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Directory holding the index
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Collection name inside the store
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
        }
    }
}

/// Retrieval and prompt budget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Passages retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Drop passages scoring below this cosine similarity
    #[serde(default)]
    pub min_score: Option<f32>,

    /// Character budget for the joined context block
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_score: None,
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_generation_url() -> String {
    "https://api.studio.nebius.ai".to_string()
}

fn default_generation_model() -> String {
    "meta-llama/Meta-Llama-3.1-8B-Instruct".to_string()
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_batch_size() -> usize {
    32
}

fn default_store_path() -> PathBuf {
    PathBuf::from("vector_db")
}

fn default_collection() -> String {
    "occultum".to_string()
}

fn default_top_k() -> usize {
    2
}

fn default_max_context_chars() -> usize {
    8000
}

impl Config {
    /// Load config from `$OCCULTUM_CONFIG` or the default path, then apply env overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut config = Self::load_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a YAML config file; a missing file yields the defaults
    pub fn load_file(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Override fields from environment variables looked up through `var`
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = var("OCCULTUM_API_KEY").or_else(|| var("NEBIUS_API_KEY")) {
            self.generation.api_key = Some(key);
        }
        if let Some(url) = var("OCCULTUM_LLM_URL") {
            self.generation.url = url;
        }
        if let Some(model) = var("OCCULTUM_LLM_MODEL") {
            self.generation.model = model;
        }
        if let Some(url) = var("OCCULTUM_EMBEDDING_URL") {
            self.embedding.url = Some(url);
        }
        if let Some(model) = var("OCCULTUM_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dims) = var("OCCULTUM_EMBEDDING_DIMS") {
            self.embedding.dimensions = parse_env("OCCULTUM_EMBEDDING_DIMS", &dims)?;
        }
        if let Some(path) = var("OCCULTUM_STORE") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(collection) = var("OCCULTUM_COLLECTION") {
            self.store.collection = collection;
        }
        if let Some(k) = var("OCCULTUM_TOP_K") {
            self.retrieval.top_k = parse_env("OCCULTUM_TOP_K", &k)?;
        }
        if let Some(score) = var("OCCULTUM_MIN_SCORE") {
            self.retrieval.min_score = Some(parse_env("OCCULTUM_MIN_SCORE", &score)?);
        }
        if let Some(secs) = var("OCCULTUM_TIMEOUT_SECS") {
            let secs: u64 = parse_env("OCCULTUM_TIMEOUT_SECS", &secs)?;
            self.generation.timeout_secs = secs;
            self.embedding.timeout_secs = secs;
        }
        Ok(())
    }

    /// Reject values no service can run with
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(OccultumError::Config("top_k must be at least 1".into()));
        }
        if let Some(score) = self.retrieval.min_score {
            if !(-1.0..=1.0).contains(&score) {
                return Err(OccultumError::Config(format!(
                    "min_score must lie in [-1, 1], got {}",
                    score
                )));
            }
        }
        if self.embedding.dimensions == 0 {
            return Err(OccultumError::Config(
                "embedding dimensions must be positive".into(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(OccultumError::Config(
                "embedding batch_size must be positive".into(),
            ));
        }
        if self.generation.timeout_secs == 0 || self.embedding.timeout_secs == 0 {
            return Err(OccultumError::Config("timeouts must be positive".into()));
        }
        if self.generation.max_attempts == 0 {
            return Err(OccultumError::Config(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.store.collection.trim().is_empty() {
            return Err(OccultumError::Config(
                "collection name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Embeddings endpoint, falling back to the generation endpoint
    pub fn embeddings_url(&self) -> &str {
        self.embedding.url.as_deref().unwrap_or(&self.generation.url)
    }

    /// Embeddings key, falling back to the generation key
    pub fn embeddings_api_key(&self) -> Option<&str> {
        self.embedding
            .api_key
            .as_deref()
            .or(self.generation.api_key.as_deref())
    }

    /// Copy with every secret replaced, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.generation.api_key.is_some() {
            copy.generation.api_key = Some("***".to_string());
        }
        if copy.embedding.api_key.is_some() {
            copy.embedding.api_key = Some("***".to_string());
        }
        copy
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OccultumError::Config(format!("{} has an invalid value: {}", key, value)))
}
