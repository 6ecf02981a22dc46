//! Vector storage operations
//!
//! Stores embeddings as BLOBs and computes cosine similarity in Rust.

use super::VectorStore;
use crate::error::{OccultumError, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

/// A stored document with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// One nearest-neighbour match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub id: String,
    pub text: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

impl VectorStore {
    /// Insert a document, or replace the text and embedding of an existing id
    pub fn upsert(&self, id: &str, text: &str, embedding: &[f32]) -> Result<()> {
        self.check_embedding(embedding)?;
        let conn = self.lock()?;
        upsert_row(&conn, &self.collection.name, id, text, embedding)?;
        Ok(())
    }

    /// Upsert many records in one transaction
    pub fn upsert_many(&self, records: &[DocumentRecord]) -> Result<usize> {
        for record in records {
            self.check_embedding(&record.embedding)?;
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for record in records {
            upsert_row(
                &tx,
                &self.collection.name,
                &record.id,
                &record.text,
                &record.embedding,
            )?;
        }
        tx.commit()?;

        tracing::debug!(
            "Upserted {} documents into '{}'",
            records.len(),
            self.collection.name
        );
        Ok(records.len())
    }

    /// Nearest documents to `embedding`, best first
    ///
    /// Returns at most `k` matches; an empty collection yields an empty list.
    /// Equal scores keep insertion order.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredDocument>> {
        self.check_embedding(embedding)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT id, text, embedding FROM documents
                 WHERE collection = ?1
                 ORDER BY seq",
            )?;
            let rows = stmt
                .query_map(params![self.collection.name], |row| {
                    let id: String = row.get(0)?;
                    let text: String = row.get(1)?;
                    let bytes: Vec<u8> = row.get(2)?;
                    Ok((id, text, bytes))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let mut scored = Vec::with_capacity(rows.len());
        for (id, text, bytes) in rows {
            let stored = bytes_to_embedding(&bytes);
            if stored.len() != embedding.len() {
                return Err(OccultumError::StoreUnavailable(format!(
                    "corrupt embedding for '{}': {} bytes",
                    id,
                    bytes.len()
                )));
            }
            let score = cosine_similarity(embedding, &stored);
            scored.push(ScoredDocument { id, text, score });
        }

        // Stable sort keeps insertion order among ties; scores are always finite
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        Ok(scored)
    }

    /// Get a document by id
    pub fn get(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT id, text, embedding FROM documents WHERE collection = ?1 AND id = ?2",
                params![self.collection.name, id],
                |row| {
                    let bytes: Vec<u8> = row.get(2)?;
                    Ok(DocumentRecord {
                        id: row.get(0)?,
                        text: row.get(1)?,
                        embedding: bytes_to_embedding(&bytes),
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Delete a document, returning whether it existed
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![self.collection.name, id],
        )?;
        Ok(rows > 0)
    }

    fn check_embedding(&self, embedding: &[f32]) -> Result<()> {
        let expected = self.collection.dimensions;
        if embedding.len() != expected {
            return Err(OccultumError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        if let Some(position) = embedding.iter().position(|x| !x.is_finite()) {
            return Err(OccultumError::InvalidEmbedding(format!(
                "component {} is {}",
                position, embedding[position]
            )));
        }
        Ok(())
    }
}

fn upsert_row(
    conn: &rusqlite::Connection,
    collection: &str,
    id: &str,
    text: &str,
    embedding: &[f32],
) -> rusqlite::Result<usize> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO documents (collection, id, text, embedding, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(collection, id) DO UPDATE SET
             text = excluded.text,
             embedding = excluded.embedding",
        params![collection, id, text, embedding_to_bytes(embedding), now],
    )
}

/// Convert f32 embedding to bytes (little-endian)
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
///
/// Accumulates in f64 so large finite components cannot overflow.
/// Zero or non-finite inputs score 0.0; the result is clamped to [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }

    let similarity = dot / denominator;
    if !similarity.is_finite() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0) as f32
}
