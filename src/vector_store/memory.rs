//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{nearest, DocumentChunk, IndexedFile, RetrievedDocument, VectorStore};
use crate::error::{Result, SmartLearnError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store.
pub struct MemoryVectorStore {
    chunks: RwLock<HashMap<String, DocumentChunk>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, DocumentChunk>>> {
        self.chunks
            .read()
            .map_err(|e| SmartLearnError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, DocumentChunk>>> {
        self.chunks
            .write()
            .map_err(|e| SmartLearnError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_batch(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        let mut store = self.write()?;
        let mut seen = HashSet::new();
        if let Some(dup) = chunks
            .iter()
            .find(|c| store.contains_key(&c.id) || !seen.insert(c.id.as_str()))
        {
            return Err(SmartLearnError::VectorStore(format!(
                "Chunk {} is already stored",
                dup.id
            )));
        }
        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(chunks.len())
    }

    async fn query(&self, query_embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>> {
        let chunks = self.read()?;
        let hits = chunks
            .values()
            .map(|chunk| RetrievedDocument::from_chunk(chunk, query_embedding))
            .collect();
        Ok(nearest(hits, k))
    }

    async fn delete_by_filename(&self, filename: &str) -> Result<usize> {
        let mut chunks = self.write()?;
        let initial_len = chunks.len();
        chunks.retain(|_, chunk| chunk.metadata.filename != filename);
        Ok(initial_len - chunks.len())
    }

    async fn get_by_filename(&self, filename: &str) -> Result<Vec<DocumentChunk>> {
        let chunks = self.read()?;
        let mut result: Vec<DocumentChunk> = chunks
            .values()
            .filter(|c| c.metadata.filename == filename)
            .cloned()
            .collect();
        result.sort_by_key(|c| c.order);
        Ok(result)
    }

    async fn has_filename(&self, filename: &str) -> Result<bool> {
        let chunks = self.read()?;
        Ok(chunks.values().any(|c| c.metadata.filename == filename))
    }

    async fn list_filenames(&self) -> Result<Vec<IndexedFile>> {
        let chunks = self.read()?;

        let mut file_map: HashMap<String, IndexedFile> = HashMap::new();
        for chunk in chunks.values() {
            let entry = file_map
                .entry(chunk.metadata.filename.clone())
                .or_insert_with(|| IndexedFile {
                    filename: chunk.metadata.filename.clone(),
                    chunk_count: 0,
                    indexed_at: chunk.indexed_at,
                });

            entry.chunk_count += 1;
            if chunk.indexed_at > entry.indexed_at {
                entry.indexed_at = chunk.indexed_at;
            }
        }

        let mut files: Vec<IndexedFile> = file_map.into_values().collect();
        files.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(files)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_chunk;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let chunks = vec![
            test_chunk("t_1", "algebra.pdf", 0, vec![1.0, 0.0, 0.0]),
            test_chunk("t_2", "algebra.pdf", 1, vec![0.0, 1.0, 0.0]),
            test_chunk("t_3", "biology.pdf", 0, vec![0.7, 0.7, 0.0]),
        ];
        assert_eq!(store.add_batch(&chunks).await.unwrap(), 3);
        assert_eq!(store.count().await.unwrap(), 3);

        let hits = store.query(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "t_1");
        assert_eq!(hits[1].id, "t_3");
        assert!(hits[0].distance <= hits[1].distance);

        let files = store.list_filenames().await.unwrap();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_by_filename_removes_exactly_tagged_chunks() {
        let store = MemoryVectorStore::new();
        store
            .add_batch(&[
                test_chunk("a_1", "a.pdf", 0, vec![1.0, 0.0]),
                test_chunk("a_2", "a.pdf", 1, vec![1.0, 0.0]),
                test_chunk("b_1", "b.pdf", 0, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_by_filename("a.pdf").await.unwrap(), 2);
        assert!(!store.has_filename("a.pdf").await.unwrap());
        assert!(store.has_filename("b.pdf").await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_by_filename_in_order() {
        let store = MemoryVectorStore::new();
        store
            .add_batch(&[
                test_chunk("x_2", "x.pdf", 1, vec![1.0]),
                test_chunk("x_1", "x.pdf", 0, vec![1.0]),
            ])
            .await
            .unwrap();

        let chunks = store.get_by_filename("x.pdf").await.unwrap();
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["x_1", "x_2"]);
    }

    #[tokio::test]
    async fn test_add_batch_rejects_existing_ids() {
        let store = MemoryVectorStore::new();
        store
            .add_batch(&[test_chunk("s_1", "algebra.pdf", 0, vec![1.0])])
            .await
            .unwrap();

        let result = store
            .add_batch(&[
                test_chunk("s_2", "biology.pdf", 0, vec![1.0]),
                test_chunk("s_1", "biology.pdf", 1, vec![1.0]),
            ])
            .await;
        assert!(matches!(result, Err(SmartLearnError::VectorStore(_))));

        let kept = store.get_by_filename("algebra.pdf").await.unwrap();
        assert_eq!(kept.len(), 1);
        assert!(!store.has_filename("biology.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_equal_distances_ranked_by_id() {
        let store = MemoryVectorStore::new();
        let chunks: Vec<_> = ["c_3", "c_1", "c_4", "c_2"]
            .iter()
            .map(|id| test_chunk(id, "algebra.pdf", 0, vec![1.0, 0.0]))
            .collect();
        store.add_batch(&chunks).await.unwrap();

        let hits = store.query(&[1.0, 0.0], 4).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["c_1", "c_2", "c_3", "c_4"]);
    }
}
