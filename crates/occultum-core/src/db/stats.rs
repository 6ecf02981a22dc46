//! Store statistics

use super::VectorStore;
use crate::error::Result;
use rusqlite::params;

/// Collection stats
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub collection: String,
    pub model: String,
    pub dimensions: usize,
    pub document_count: usize,
    pub path: Option<String>,
    pub created_at: String,
}

impl VectorStore {
    /// Number of documents in the bound collection
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![self.collection.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Get collection statistics
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            collection: self.collection.name.clone(),
            model: self.collection.model.clone(),
            dimensions: self.collection.dimensions,
            document_count: self.count()?,
            path: self.path().map(|p| p.display().to_string()),
            created_at: self.collection.created_at.clone(),
        })
    }
}
