//! Vector store abstraction for SmartLearn.
//!
//! Chunks are tagged with the filename they came from; a document is removed
//! by deleting its whole filename batch.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One level of a chunk's header path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderLevel {
    /// Header depth, 1 for `#` through 4 for `####`.
    pub level: u8,
    /// Header text.
    pub title: String,
}

/// Provenance of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source document name.
    pub filename: String,
    /// Header path, outermost first.
    pub headers: Vec<HeaderLevel>,
    /// The uncut section text the chunk was drawn from.
    pub raw_text: String,
}

impl ChunkMetadata {
    /// Whether two chunks sit under the same header path.
    pub fn same_section(&self, other: &ChunkMetadata) -> bool {
        self.headers == other.headers
    }
}

/// A chunk stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Chunk ID, `{timestamp}_{n}`.
    pub id: String,
    /// Text that was embedded.
    pub content: String,
    /// Provenance.
    pub metadata: ChunkMetadata,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Position of this chunk within its document.
    pub order: i32,
    /// When this chunk was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// A query hit.
#[derive(Debug, Clone)]
pub struct RetrievedDocument {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query (lower is more relevant).
    pub distance: f32,
}

impl RetrievedDocument {
    fn from_chunk(chunk: &DocumentChunk, query_embedding: &[f32]) -> Self {
        Self {
            id: chunk.id.clone(),
            content: chunk.content.clone(),
            metadata: chunk.metadata.clone(),
            distance: cosine_distance(query_embedding, &chunk.embedding),
        }
    }
}

/// Summary information about an indexed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFile {
    pub filename: String,
    pub chunk_count: u32,
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks; an existing ID is replaced.
    async fn add_batch(&self, chunks: &[DocumentChunk]) -> Result<usize>;

    /// The `k` nearest chunks, ascending by distance.
    async fn query(&self, query_embedding: &[f32], k: usize) -> Result<Vec<RetrievedDocument>>;

    /// Remove exactly the chunks tagged with `filename`.
    async fn delete_by_filename(&self, filename: &str) -> Result<usize>;

    /// All chunks of a file in ingest order.
    async fn get_by_filename(&self, filename: &str) -> Result<Vec<DocumentChunk>>;

    /// Whether any chunk is tagged with `filename`.
    async fn has_filename(&self, filename: &str) -> Result<bool>;

    /// Indexed files, most recent first.
    async fn list_filenames(&self) -> Result<Vec<IndexedFile>>;

    /// Total chunk count.
    async fn count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Cosine distance, `1 - similarity`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Sort hits ascending by distance and keep the first `k`.
pub(crate) fn nearest(mut hits: Vec<RetrievedDocument>, k: usize) -> Vec<RetrievedDocument> {
    // Equal distances fall back to id order so every backend ranks alike.
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
pub(crate) fn test_chunk(id: &str, filename: &str, order: i32, embedding: Vec<f32>) -> DocumentChunk {
    DocumentChunk {
        id: id.to_string(),
        content: format!("content of {}", id),
        metadata: ChunkMetadata {
            filename: filename.to_string(),
            headers: vec![HeaderLevel {
                level: 2,
                title: "Intro".to_string(),
            }],
            raw_text: format!("raw text of {}", id),
        },
        embedding,
        order,
        indexed_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_distance_range() {
        let a = vec![1.0, 0.0];
        assert!(cosine_distance(&a, &a).abs() < 0.001);
        assert!((cosine_distance(&a, &[-1.0, 0.0]) - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_same_section_compares_header_path() {
        let a = test_chunk("1", "a.pdf", 0, vec![]).metadata;
        let mut b = test_chunk("2", "a.pdf", 1, vec![]).metadata;
        assert!(a.same_section(&b));

        b.headers.push(HeaderLevel {
            level: 3,
            title: "Details".to_string(),
        });
        assert!(!a.same_section(&b));
    }
}
