//! Vector store
//!
//! A directory holding one SQLite index (`index.sqlite`) with:
//! - named collections, each bound to one embedding model and dimensionality
//! - document records with their embeddings stored as little-endian BLOBs
//! - brute-force cosine nearest-neighbour search

mod content;
mod schema;
mod stats;
pub mod vectors;

pub use content::{document_id, hash_content};
pub use schema::{CollectionInfo, VectorStore, INDEX_FILE};
pub use stats::StoreStats;
pub use vectors::{cosine_similarity, DocumentRecord, ScoredDocument};
