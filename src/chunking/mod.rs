//! Chunking of parsed documents into embeddable passages.
//!
//! Markdown is first split at headers, then each section is cut into
//! overlapping pieces. Every piece keeps the filename, its header path and
//! the full section text it came from.

mod markdown;
mod splitter;

pub use markdown::{split_by_headers, Section};
pub use splitter::{split_text, SEPARATORS};

use crate::config::ChunkingSettings;
use crate::vector_store::{ChunkMetadata, DocumentChunk};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// A chunk ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingChunk {
    /// `{yyyymmddHHMMSS}_{document}_{n}`, n starting at 1.
    pub id: String,
    /// Provenance-prefixed text.
    pub content: String,
    pub metadata: ChunkMetadata,
    pub order: i32,
}

impl PendingChunk {
    /// Attach an embedding.
    pub fn into_document(self, embedding: Vec<f32>, indexed_at: DateTime<Utc>) -> DocumentChunk {
        DocumentChunk {
            id: self.id,
            content: self.content,
            metadata: self.metadata,
            embedding,
            order: self.order,
            indexed_at,
        }
    }
}

/// Splits markdown documents into tagged chunks.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Self {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    /// Chunk a document, stamping IDs with the current local time and a
    /// per-document UUID so documents chunked in the same second never share
    /// an ID.
    pub fn chunk(&self, markdown: &str, filename: &str) -> Vec<PendingChunk> {
        let stamp = format!(
            "{}_{}",
            Local::now().format("%Y%m%d%H%M%S"),
            Uuid::new_v4().simple()
        );
        self.chunk_with_stamp(markdown, filename, &stamp)
    }

    /// Chunk a document with an explicit ID prefix.
    pub fn chunk_with_stamp(&self, markdown: &str, filename: &str, stamp: &str) -> Vec<PendingChunk> {
        let mut chunks = Vec::new();

        for section in split_by_headers(markdown) {
            for piece in split_text(&section.body, self.chunk_size, self.chunk_overlap) {
                let n = chunks.len() + 1;
                let metadata = ChunkMetadata {
                    filename: filename.to_string(),
                    headers: section.headers.clone(),
                    raw_text: section.body.clone(),
                };
                chunks.push(PendingChunk {
                    id: format!("{}_{}", stamp, n),
                    content: with_provenance(&piece, &metadata),
                    metadata,
                    order: (n - 1) as i32,
                });
            }
        }

        debug!("Chunked {} into {} pieces", filename, chunks.len());
        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_settings(&ChunkingSettings::default())
    }
}

/// Wrap a piece with its header titles (deepest first) and the document name.
fn with_provenance(piece: &str, metadata: &ChunkMetadata) -> String {
    let mut content = piece.to_string();
    for header in metadata.headers.iter().rev() {
        content = format!("Section \"{}\": {}", header.title, content);
    }
    format!("Document {}: {}", metadata.filename, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LECTURE: &str = "# Algebra\n## Linear equations\nA linear equation has degree one.\n\nIts graph is a straight line.\n## Quadratics\nA quadratic has degree two.";

    #[test]
    fn test_every_chunk_tagged_with_filename() {
        let chunks = Chunker::new(40, 0).chunk_with_stamp(LECTURE, "algebra.pdf", "20240101120000");
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.metadata.filename == "algebra.pdf"));
    }

    #[test]
    fn test_ids_numbered_from_one() {
        let chunks = Chunker::new(1000, 200).chunk_with_stamp(LECTURE, "algebra.pdf", "20240101120000");
        let ids: Vec<_> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["20240101120000_1", "20240101120000_2"]);
        assert_eq!(chunks[1].order, 1);
    }

    #[test]
    fn test_content_prefixed_with_headers_and_document() {
        let chunks = Chunker::new(1000, 0).chunk_with_stamp(LECTURE, "algebra.pdf", "s");
        assert_eq!(
            chunks[1].content,
            "Document algebra.pdf: Section \"Algebra\": Section \"Quadratics\": A quadratic has degree two."
        );
    }

    #[test]
    fn test_raw_text_is_whole_section() {
        let chunks = Chunker::new(40, 0).chunk_with_stamp(LECTURE, "algebra.pdf", "s");
        let first = &chunks[0];
        assert_eq!(
            first.metadata.raw_text,
            "A linear equation has degree one.\n\nIts graph is a straight line."
        );
        assert!(first.metadata.raw_text.contains("straight line"));
        assert_eq!(chunks[1].metadata.raw_text, first.metadata.raw_text);
    }

    #[test]
    fn test_chunk_stamp_format() {
        let chunks = Chunker::default().chunk("plain text", "notes.pdf");
        let parts: Vec<_> = chunks[0].id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 14);
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2], "1");
    }

    #[test]
    fn test_documents_chunked_together_get_distinct_ids() {
        let chunker = Chunker::default();
        let algebra = chunker.chunk("Matrices are grids.", "algebra.pdf");
        let biology = chunker.chunk("Cells divide.", "biology.pdf");
        assert_ne!(algebra[0].id, biology[0].id);
    }
}
