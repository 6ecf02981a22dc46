//! Content-derived document ids

use sha2::{Digest, Sha256};

/// Hash content using SHA-256
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable document id for text ingested without one (first 16 hex chars of its hash)
pub fn document_id(content: &str) -> String {
    hash_content(content).chars().take(16).collect()
}
