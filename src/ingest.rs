//! Ingestion pipeline: PDF bytes to indexed chunks.

use crate::chunking::Chunker;
use crate::embedding::Embedder;
use crate::error::{Result, SmartLearnError};
use crate::pdf::{page_texts, DocumentParser};
use crate::storage::{Bucket, ObjectStore};
use crate::vector_store::VectorStore;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// Result of ingesting one PDF.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub filename: String,
    pub chunks_indexed: usize,
}

/// Result of removing one PDF.
#[derive(Debug, Clone, Serialize)]
pub struct RemovalOutcome {
    pub filename: String,
    pub object_deleted: bool,
    pub chunks_deleted: usize,
}

/// Parses, chunks, embeds and indexes uploaded PDFs.
pub struct Ingestor {
    parser: Arc<dyn DocumentParser>,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    objects: Arc<dyn ObjectStore>,
    /// Names with an ingestion under way.
    in_flight: Mutex<HashSet<String>>,
}

/// Holds a filename in `in_flight` until dropped.
struct Reservation<'a> {
    names: &'a Mutex<HashSet<String>>,
    filename: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if let Ok(mut names) = self.names.lock() {
            names.remove(&self.filename);
        }
    }
}

impl Ingestor {
    pub fn new(
        parser: Arc<dyn DocumentParser>,
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            parser,
            chunker,
            embedder,
            vector_store,
            objects,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Whether an ingestion of `filename` is currently running.
    pub fn is_in_flight(&self, filename: &str) -> bool {
        self.in_flight
            .lock()
            .map(|names| names.contains(filename))
            .unwrap_or(false)
    }

    fn reserve(&self, filename: &str) -> Result<Reservation<'_>> {
        let mut names = self
            .in_flight
            .lock()
            .map_err(|e| SmartLearnError::Storage(format!("Failed to acquire lock: {}", e)))?;
        if !names.insert(filename.to_string()) {
            info!("{} is already being ingested", filename);
            return Err(SmartLearnError::AlreadyExists(filename.to_string()));
        }
        Ok(Reservation {
            names: &self.in_flight,
            filename: filename.to_string(),
        })
    }

    /// Index a PDF and keep a copy in the files bucket.
    ///
    /// A filename already present in the files bucket, or one whose
    /// ingestion is still running, is rejected with `AlreadyExists` before
    /// any parsing happens.
    #[instrument(skip(self, pdf), fields(bytes = pdf.len()))]
    pub async fn ingest(&self, pdf: &[u8], filename: &str) -> Result<IngestOutcome> {
        validate_pdf_name(filename)?;
        let _reservation = self.reserve(filename)?;

        if self.objects.exists(Bucket::Files, filename).await? {
            info!("{} already uploaded, skipping", filename);
            return Err(SmartLearnError::AlreadyExists(filename.to_string()));
        }

        let pages = page_texts(pdf)?;
        info!("Parsing {} pages", pages.len());
        let markdown = self.parser.to_markdown(&pages, filename).await?;

        let pending = self.chunker.chunk(&markdown, filename);
        if pending.is_empty() {
            warn!("{} produced no chunks", filename);
        }

        let texts: Vec<String> = pending.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != pending.len() {
            return Err(SmartLearnError::Embedding(format!(
                "Expected {} embeddings, got {}",
                pending.len(),
                embeddings.len()
            )));
        }

        let indexed_at = Utc::now();
        let chunks: Vec<_> = pending
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| chunk.into_document(embedding, indexed_at))
            .collect();

        let chunks_indexed = self.vector_store.add_batch(&chunks).await?;

        if let Err(e) = self
            .objects
            .put(Bucket::Files, filename, pdf, "application/pdf")
            .await
        {
            warn!("Storing {} failed, removing its chunks: {}", filename, e);
            self.vector_store.delete_by_filename(filename).await?;
            return Err(e);
        }

        info!("Indexed {} chunks from {}", chunks_indexed, filename);
        Ok(IngestOutcome {
            filename: filename.to_string(),
            chunks_indexed,
        })
    }

    /// Remove a PDF and every chunk tagged with its filename.
    #[instrument(skip(self))]
    pub async fn delete(&self, filename: &str) -> Result<RemovalOutcome> {
        let object_deleted = match self.objects.delete(Bucket::Files, filename).await {
            Ok(()) => true,
            Err(SmartLearnError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        let chunks_deleted = self.vector_store.delete_by_filename(filename).await?;

        if !object_deleted && chunks_deleted == 0 {
            return Err(SmartLearnError::NotFound(filename.to_string()));
        }

        info!("Removed {} ({} chunks)", filename, chunks_deleted);
        Ok(RemovalOutcome {
            filename: filename.to_string(),
            object_deleted,
            chunks_deleted,
        })
    }

    /// Names of uploaded PDFs.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.objects.list(Bucket::Files, "").await
    }

    /// Bytes of an uploaded PDF.
    pub async fn download(&self, filename: &str) -> Result<Vec<u8>> {
        self.objects.get(Bucket::Files, filename).await
    }
}

/// Reject names that do not end in `.pdf`.
pub fn validate_pdf_name(filename: &str) -> Result<()> {
    if filename.to_lowercase().ends_with(".pdf") {
        Ok(())
    } else {
        Err(SmartLearnError::InvalidInput(format!(
            "Only PDF files are accepted: {}",
            filename
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BucketNames;
    use crate::embedding::MockEmbedder;
    use crate::pdf::fixtures::pdf_with_pages;
    use crate::pdf::TextParser;
    use crate::storage::LocalObjectStore;
    use crate::vector_store::MemoryVectorStore;

    fn ingestor(dir: &tempfile::TempDir) -> (Ingestor, Arc<MemoryVectorStore>) {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = Ingestor::new(
            Arc::new(TextParser::new()),
            Chunker::new(200, 20),
            Arc::new(MockEmbedder::default()),
            store.clone(),
            Arc::new(LocalObjectStore::new(dir.path(), BucketNames::default())),
        );
        (ingestor, store)
    }

    #[test]
    fn test_validate_pdf_name() {
        assert!(validate_pdf_name("notes.PDF").is_ok());
        assert!(validate_pdf_name("notes.docx").is_err());
    }

    #[tokio::test]
    async fn test_ingest_then_reupload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, store) = ingestor(&dir);
        let pdf = pdf_with_pages(&[&["Vectors", "A vector has magnitude and direction."]]);

        let outcome = ingestor.ingest(&pdf, "vectors.pdf").await.unwrap();
        assert!(outcome.chunks_indexed > 0);
        let count = store.count().await.unwrap();

        let again = ingestor.ingest(&pdf, "vectors.pdf").await;
        assert!(matches!(again, Err(SmartLearnError::AlreadyExists(_))));
        assert_eq!(store.count().await.unwrap(), count);
        assert_eq!(ingestor.list().await.unwrap(), vec!["vectors.pdf"]);
    }

    #[tokio::test]
    async fn test_delete_removes_object_and_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, store) = ingestor(&dir);
        let pdf = pdf_with_pages(&[&["Limits", "A limit describes approach."]]);
        ingestor.ingest(&pdf, "limits.pdf").await.unwrap();

        let removed = ingestor.delete("limits.pdf").await.unwrap();
        assert!(removed.object_deleted);
        assert!(removed.chunks_deleted > 0);
        assert_eq!(store.count().await.unwrap(), 0);

        let missing = ingestor.delete("limits.pdf").await;
        assert!(matches!(missing, Err(SmartLearnError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_of_one_name_index_once() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, store) = ingestor(&dir);
        let pdf = pdf_with_pages(&[&["Vectors", "A vector has magnitude and direction."]]);

        let (first, second) = tokio::join!(
            ingestor.ingest(&pdf, "vectors.pdf"),
            ingestor.ingest(&pdf, "vectors.pdf")
        );

        let outcomes = [first, second];
        let indexed: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(indexed.len(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(SmartLearnError::AlreadyExists(_)))));
        assert_eq!(store.count().await.unwrap(), indexed[0].chunks_indexed);
        assert!(!ingestor.is_in_flight("vectors.pdf"));
    }

    #[tokio::test]
    async fn test_two_documents_keep_their_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, store) = ingestor(&dir);
        let algebra = pdf_with_pages(&[&["Matrices", "A matrix is a grid of numbers."]]);
        let biology = pdf_with_pages(&[&["Cells", "A cell is the unit of life."]]);

        let a = ingestor.ingest(&algebra, "algebra.pdf").await.unwrap();
        let b = ingestor.ingest(&biology, "biology.pdf").await.unwrap();

        assert_eq!(store.count().await.unwrap(), a.chunks_indexed + b.chunks_indexed);
        assert_eq!(store.get_by_filename("algebra.pdf").await.unwrap().len(), a.chunks_indexed);

        let removed = ingestor.delete("algebra.pdf").await.unwrap();
        assert_eq!(removed.chunks_deleted, a.chunks_indexed);
        let left = store.get_by_filename("biology.pdf").await.unwrap();
        assert_eq!(left.len(), b.chunks_indexed);
        assert!(left.iter().all(|c| c.metadata.filename == "biology.pdf"));
    }

    #[tokio::test]
    async fn test_non_pdf_rejected_before_storage() {
        let dir = tempfile::tempdir().unwrap();
        let (ingestor, _) = ingestor(&dir);
        let result = ingestor.ingest(b"hello", "notes.txt").await;
        assert!(matches!(result, Err(SmartLearnError::InvalidInput(_))));
    }
}
