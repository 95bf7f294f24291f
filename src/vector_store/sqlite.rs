//! SQLite-backed document index, opened read-only.
//!
//! Cosine similarity is computed in Rust over every stored chunk. Embeddings
//! are stored as little-endian `f32` blobs.

use super::{rank, Chunk, IndexedSource, SearchResult, VectorStore};
use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use rusqlite::{types::Type, Connection, OpenFlags};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

/// Table layout the external indexer is expected to produce.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    source TEXT,
    page INTEGER,
    embedding BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
"#;

/// SQLite document index.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open an existing index read-only.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScoutError::VectorStore(format!(
                "Document index not found at {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let has_table: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'chunks'",
            [],
            |row| row.get(0),
        )?;
        if !has_table {
            return Err(ScoutError::VectorStore(format!(
                "{} has no 'chunks' table",
                path.display()
            )));
        }

        info!("Opened document index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ScoutError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT id, content, source, page, embedding FROM chunks")?;

        let chunks = stmt
            .query_map([], |row| {
                let embedding_bytes: Vec<u8> = row.get(4)?;
                if embedding_bytes.len() % 4 != 0 {
                    return Err(rusqlite::Error::FromSqlConversionFailure(
                        4,
                        Type::Blob,
                        format!(
                            "embedding blob of {} bytes is not a sequence of f32 values",
                            embedding_bytes.len()
                        )
                        .into(),
                    ));
                }
                Ok(Chunk {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    source: row.get(2)?,
                    page: row.get(3)?,
                    embedding: Self::bytes_to_embedding(&embedding_bytes),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let results = rank(query_embedding, chunks, limit)?;

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(source, 'Unknown') AS name, COUNT(*), MAX(page)
            FROM chunks
            GROUP BY name
            ORDER BY name
            "#,
        )?;

        let sources = stmt
            .query_map([], |row| {
                Ok(IndexedSource {
                    source: row.get(0)?,
                    chunk_count: row.get(1)?,
                    max_page: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sources)
    }

    async fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
