//! Store schema, opening and collection registration

use crate::error::{OccultumError, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// File holding the index inside the store directory
pub const INDEX_FILE: &str = "index.sqlite";

const SCHEMA_VERSION: i32 = 1;

const CREATE_TABLES: &str = r#"
-- Named collections, each bound to one embedding model
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    model TEXT NOT NULL,
    dimensions INTEGER NOT NULL,
    distance TEXT NOT NULL DEFAULT 'cosine',
    created_at TEXT NOT NULL
);

-- Document records; seq fixes the tie-break order for equal scores
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL REFERENCES collections(name),
    id TEXT NOT NULL,
    text TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(collection, id)
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, seq);
"#;

/// Collection metadata as recorded in the store
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub model: String,
    pub dimensions: usize,
    pub created_at: String,
}

/// Handle to one collection of a persisted vector store
///
/// The connection sits behind a mutex so a single handle can be shared
/// across request tasks; reads never mutate the store.
pub struct VectorStore {
    pub(crate) conn: Mutex<Connection>,
    pub(crate) collection: CollectionInfo,
    path: Option<PathBuf>,
}

impl VectorStore {
    /// Open (or create) the store directory and bind to `collection`
    ///
    /// The collection is created on first use and records `model` and
    /// `dimensions`; later opens must present the same model.
    pub fn open(
        dir: impl AsRef<Path>,
        collection: &str,
        model: &str,
        dimensions: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            OccultumError::StoreUnavailable(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let index_path = dir.join(INDEX_FILE);
        let conn = Connection::open(&index_path).map_err(|e| {
            OccultumError::StoreUnavailable(format!("cannot open {}: {}", index_path.display(), e))
        })?;
        initialize(&conn).map_err(|e| {
            OccultumError::StoreUnavailable(format!(
                "cannot initialize {}: {}",
                index_path.display(),
                e
            ))
        })?;

        let info = register_collection(&conn, collection, model, dimensions)?;
        tracing::info!(
            "Opened collection '{}' at {} ({}, {} dims)",
            info.name,
            dir.display(),
            info.model,
            info.dimensions
        );

        Ok(Self {
            conn: Mutex::new(conn),
            collection: info,
            path: Some(dir.to_path_buf()),
        })
    }

    /// Open an existing store and collection without creating either
    ///
    /// Read paths use this so a mistyped collection name is reported
    /// instead of being registered.
    pub fn open_existing(
        dir: impl AsRef<Path>,
        collection: &str,
        model: &str,
        dimensions: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let not_found = || OccultumError::CollectionNotFound {
            collection: collection.to_string(),
            path: dir.to_path_buf(),
        };

        let index_path = dir.join(INDEX_FILE);
        if !index_path.is_file() {
            return Err(not_found());
        }
        let conn = Connection::open_with_flags(
            &index_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .and_then(|conn| configure(&conn).map(|_| conn))
        .map_err(|e| {
            OccultumError::StoreUnavailable(format!("cannot open {}: {}", index_path.display(), e))
        })?;

        let info = find_collection(&conn, collection)
            .map_err(|e| {
                OccultumError::StoreUnavailable(format!(
                    "cannot read {}: {}",
                    index_path.display(),
                    e
                ))
            })?
            .ok_or_else(not_found)?;
        check_identity(&info, model, dimensions)?;
        tracing::info!(
            "Opened collection '{}' at {} ({}, {} dims)",
            info.name,
            dir.display(),
            info.model,
            info.dimensions
        );

        Ok(Self {
            conn: Mutex::new(conn),
            collection: info,
            path: Some(dir.to_path_buf()),
        })
    }

    /// Open (or create) the store and collection named in the configuration
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        Self::open(
            &config.store.path,
            &config.store.collection,
            &config.embedding.model,
            config.embedding.dimensions,
        )
    }

    /// Open the configured collection, which must already exist
    pub fn existing_from_config(config: &crate::config::Config) -> Result<Self> {
        Self::open_existing(
            &config.store.path,
            &config.store.collection,
            &config.embedding.model,
            config.embedding.dimensions,
        )
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory(collection: &str, model: &str, dimensions: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize(&conn)?;
        let info = register_collection(&conn, collection, model, dimensions)?;
        Ok(Self {
            conn: Mutex::new(conn),
            collection: info,
            path: None,
        })
    }

    /// Metadata of the bound collection
    pub fn collection(&self) -> &CollectionInfo {
        &self.collection
    }

    /// Vector length every record in this collection has
    pub fn dimensions(&self) -> usize {
        self.collection.dimensions
    }

    /// Store directory, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<Option<i32>> {
        let conn = self.lock()?;
        let version = conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| OccultumError::StoreUnavailable("store lock poisoned".to_string()))
    }
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
}

fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    configure(conn)?;
    conn.execute_batch(CREATE_TABLES)?;
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
        params![SCHEMA_VERSION],
    )?;
    Ok(())
}

fn find_collection(conn: &Connection, name: &str) -> rusqlite::Result<Option<CollectionInfo>> {
    conn.query_row(
        "SELECT name, model, dimensions, created_at FROM collections WHERE name = ?1",
        params![name],
        |row| {
            Ok(CollectionInfo {
                name: row.get(0)?,
                model: row.get(1)?,
                dimensions: row.get::<_, i64>(2)? as usize,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()
}

fn check_identity(info: &CollectionInfo, model: &str, dimensions: usize) -> Result<()> {
    if info.model != model {
        return Err(OccultumError::EmbeddingModelMismatch {
            collection: info.name.clone(),
            stored: info.model.clone(),
            configured: model.to_string(),
        });
    }
    if info.dimensions != dimensions {
        return Err(OccultumError::DimensionMismatch {
            expected: info.dimensions,
            actual: dimensions,
        });
    }
    Ok(())
}

fn register_collection(
    conn: &Connection,
    name: &str,
    model: &str,
    dimensions: usize,
) -> Result<CollectionInfo> {
    match find_collection(conn, name)? {
        Some(info) => {
            check_identity(&info, model, dimensions)?;
            Ok(info)
        }
        None => {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO collections (name, model, dimensions, distance, created_at)
                 VALUES (?1, ?2, ?3, 'cosine', ?4)",
                params![name, model, dimensions as i64, now],
            )?;
            tracing::debug!("Created collection '{}'", name);
            Ok(CollectionInfo {
                name: name.to_string(),
                model: model.to_string(),
                dimensions,
                created_at: now,
            })
        }
    }
}
