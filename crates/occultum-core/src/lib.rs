//! Occultum Core Library
//!
//! Retrieval-augmented answering over a small persisted vector store.
//!
//! # Features
//! - SQLite-backed vector store with brute-force cosine search
//! - Sentence embeddings over HTTP or in-process (`fastembed` feature)
//! - Fenced prompt assembly with a context budget
//! - OpenAI-compatible chat completion with bounded retry

pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod search;

#[cfg(test)]
pub(crate) mod test_util;

pub use config::{Config, EmbeddingBackend, EmbeddingConfig, GenerationConfig, RetrievalConfig};
pub use db::{DocumentRecord, ScoredDocument, StoreStats, VectorStore};
pub use error::{Error, GenerationError, OccultumError, Result};
pub use llm::{build_embedder, ChatClient, Embedder, Generator, HttpEmbedder, RetryPolicy};
pub use pipeline::{AnswerReport, Pipeline};
pub use prompt::assemble;
pub use search::Retriever;

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "occultum";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "occultum";
