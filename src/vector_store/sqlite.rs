//! SQLite-based vector store implementation.
//!
//! Cosine distance is computed in Rust over every stored row, which is fine
//! for a course-sized corpus of slides and handouts.

use super::{nearest, ChunkMetadata, DocumentChunk, IndexedFile, RetrievedDocument, VectorStore};
use crate::error::{Result, SmartLearnError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        filename TEXT NOT NULL,
        content TEXT NOT NULL,
        metadata_json TEXT NOT NULL,
        embedding BLOB NOT NULL,
        chunk_order INTEGER NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_filename ON chunks(filename);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, content, metadata_json, embedding, chunk_order, indexed_at FROM chunks";

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SmartLearnError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<DocumentChunk> {
        let metadata_json: String = row.get(2)?;
        let embedding_bytes: Vec<u8> = row.get(3)?;
        let indexed_at: String = row.get(5)?;

        let metadata: ChunkMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(DocumentChunk {
            id: row.get(0)?,
            content: row.get(1)?,
            metadata,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            order: row.get(4)?,
            indexed_at: Self::parse_timestamp(&indexed_at),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn add_batch(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for chunk in chunks {
            let metadata_json = serde_json::to_string(&chunk.metadata)?;
            let inserted = tx.execute(
                r#"
                INSERT INTO chunks
                (id, filename, content, metadata_json, embedding, chunk_order, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    chunk.id,
                    chunk.metadata.filename,
                    chunk.content,
                    metadata_json,
                    Self::embedding_to_bytes(&chunk.embedding),
                    chunk.order,
                    chunk.indexed_at.to_rfc3339(),
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Err(SmartLearnError::VectorStore(format!(
                        "Chunk {} is already stored",
                        chunk.id
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit()?;
        info!("Stored {} chunks", chunks.len());
        Ok(chunks.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn query(&self, query_embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(SELECT_COLUMNS)?;

        let hits: Vec<RetrievedDocument> = stmt
            .query_map([], Self::row_to_chunk)?
            .filter_map(|row| row.ok())
            .map(|chunk| RetrievedDocument::from_chunk(&chunk, query_embedding))
            .collect();

        let hits = nearest(hits, k);
        debug!("Query returned {} chunks", hits.len());
        Ok(hits)
    }

    #[instrument(skip(self))]
    async fn delete_by_filename(&self, filename: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM chunks WHERE filename = ?1", params![filename])?;
        info!("Deleted {} chunks for {}", deleted, filename);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn get_by_filename(&self, filename: &str) -> Result<Vec<DocumentChunk>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE filename = ?1 ORDER BY chunk_order",
            SELECT_COLUMNS
        ))?;

        let chunks: Vec<DocumentChunk> = stmt
            .query_map(params![filename], Self::row_to_chunk)?
            .filter_map(|row| row.ok())
            .collect();

        debug!("Found {} chunks for {}", chunks.len(), filename);
        Ok(chunks)
    }

    async fn has_filename(&self, filename: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE filename = ?1",
            params![filename],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn list_filenames(&self) -> Result<Vec<IndexedFile>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT filename, COUNT(*) as chunk_count, MAX(indexed_at) as indexed_at
            FROM chunks
            GROUP BY filename
            ORDER BY indexed_at DESC
            "#,
        )?;

        let files = stmt.query_map([], |row| {
            let indexed_at: String = row.get(2)?;
            Ok(IndexedFile {
                filename: row.get(0)?,
                chunk_count: row.get(1)?,
                indexed_at: Self::parse_timestamp(&indexed_at),
            })
        })?;

        Ok(files.filter_map(|f| f.ok()).collect())
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
