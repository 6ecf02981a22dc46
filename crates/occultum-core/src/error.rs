//! Error types for occultum

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using OccultumError
pub type Result<T> = std::result::Result<T, OccultumError>;

/// Error type alias for convenience
pub type Error = OccultumError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_INPUT: i32 = 3;
    pub const UPSTREAM_ERROR: i32 = 4;
}

/// Failure reported by the remote text-generation endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    /// HTTP status, when the endpoint answered at all
    pub status: Option<u16>,
    pub message: String,
}

impl GenerationError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Authentication or authorization rejected by the endpoint
    pub fn is_auth(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Main error type for occultum
#[derive(Debug, Error)]
pub enum OccultumError {
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Dimension mismatch: collection expects {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Collection '{collection}' was indexed with model '{stored}', but '{configured}' is configured"
    )]
    EmbeddingModelMismatch {
        collection: String,
        stored: String,
        configured: String,
    },

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("Collection '{collection}' not found in {}", .path.display())]
    CollectionNotFound { collection: String, path: PathBuf },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl OccultumError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidQuery(_)
            | Self::Config(_)
            | Self::Yaml(_)
            | Self::CollectionNotFound { .. } => exit_codes::INVALID_INPUT,
            Self::Generation(_) | Self::ModelUnavailable(_) | Self::Timeout { .. } => {
                exit_codes::UPSTREAM_ERROR
            }
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
