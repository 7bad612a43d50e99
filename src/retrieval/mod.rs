//! Retrieval ranking over expanded queries.
//!
//! Each expanded query is embedded and searched independently; the hits are
//! merged into one ranked, de-duplicated passage list for the answer model.

use crate::config::{CapPolicyKind, RetrievalSettings};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{RetrievedDocument, VectorStore};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A passage selected for the answer context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPassage {
    pub chunk_id: String,
    pub distance: f32,
    /// Full section text behind the matched chunk.
    pub raw_text: String,
}

/// How many passages survive ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapPolicy {
    /// Collect distinct section texts until `n` are gathered.
    Accumulate(usize),
    /// Keep the first `n` ranked chunks.
    Fixed(usize),
}

impl Default for CapPolicy {
    fn default() -> Self {
        CapPolicy::Accumulate(20)
    }
}

impl CapPolicy {
    pub fn from_settings(settings: &RetrievalSettings) -> Self {
        match settings.cap_policy {
            CapPolicyKind::Accumulate => CapPolicy::Accumulate(settings.max_passages),
            CapPolicyKind::Fixed => CapPolicy::Fixed(settings.max_passages),
        }
    }
}

/// Merge per-query hits into a ranked passage list.
///
/// Hits are ordered by ascending distance (ties keep query order), each chunk
/// ID is kept once at its best distance, and there is no relevance cutoff.
pub fn rank_passages(results: Vec<Vec<RetrievedDocument>>, policy: CapPolicy) -> Vec<RankedPassage> {
    let mut hits: Vec<RetrievedDocument> = results.into_iter().flatten().collect();
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut seen_ids = HashSet::new();
    let mut seen_texts = HashSet::new();
    let mut passages = Vec::new();

    for hit in hits {
        let cap = match policy {
            CapPolicy::Accumulate(n) | CapPolicy::Fixed(n) => n,
        };
        if passages.len() >= cap {
            break;
        }

        if !seen_ids.insert(hit.id.clone()) {
            continue;
        }

        if let CapPolicy::Accumulate(_) = policy {
            if !seen_texts.insert(hit.metadata.raw_text.clone()) {
                continue;
            }
        }

        passages.push(RankedPassage {
            chunk_id: hit.id,
            distance: hit.distance,
            raw_text: hit.metadata.raw_text,
        });
    }

    passages
}

/// Join passages into the context block of the answer prompt.
pub fn format_passages(passages: &[RankedPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}]\n{}", i + 1, p.raw_text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Runs expanded queries against the vector store.
pub struct Retriever {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    policy: CapPolicy,
}

impl Retriever {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            top_k: 10,
            policy: CapPolicy::default(),
        }
    }

    /// Set the number of neighbours fetched per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the capping policy.
    pub fn with_policy(mut self, policy: CapPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn from_settings(
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        settings: &RetrievalSettings,
    ) -> Self {
        Self::new(vector_store, embedder)
            .with_top_k(settings.top_k)
            .with_policy(CapPolicy::from_settings(settings))
    }

    /// Embed every query, search, and rank the merged hits.
    #[instrument(skip(self, queries), fields(queries = queries.len()))]
    pub async fn retrieve(&self, queries: &[String]) -> Result<Vec<RankedPassage>> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed_batch(queries).await?;

        let mut results = Vec::with_capacity(embeddings.len());
        for embedding in &embeddings {
            results.push(self.vector_store.query(embedding, self.top_k).await?);
        }

        let passages = rank_passages(results, self.policy);
        debug!("Ranked {} passages", passages.len());
        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbedder;
    use crate::vector_store::{ChunkMetadata, MemoryVectorStore};

    fn hit(id: &str, distance: f32, raw: &str) -> RetrievedDocument {
        RetrievedDocument {
            id: id.to_string(),
            content: String::new(),
            metadata: ChunkMetadata {
                filename: "f.pdf".to_string(),
                headers: vec![],
                raw_text: raw.to_string(),
            },
            distance,
        }
    }

    #[test]
    fn test_rank_sorts_and_dedups_ids() {
        let results = vec![
            vec![hit("a", 0.4, "A"), hit("b", 0.1, "B")],
            vec![hit("a", 0.2, "A"), hit("c", 0.3, "C")],
        ];
        let ranked = rank_passages(results, CapPolicy::Accumulate(20));

        let ids: Vec<_> = ranked.iter().map(|p| p.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!((ranked[1].distance - 0.2).abs() < f32::EPSILON);
        assert!(ranked.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_accumulate_skips_repeated_sections_and_caps() {
        let results = vec![vec![
            hit("1", 0.1, "same section"),
            hit("2", 0.2, "same section"),
            hit("3", 0.3, "other"),
            hit("4", 0.4, "third"),
        ]];
        let ranked = rank_passages(results, CapPolicy::Accumulate(2));
        let texts: Vec<_> = ranked.iter().map(|p| p.raw_text.as_str()).collect();
        assert_eq!(texts, vec!["same section", "other"]);
    }

    #[test]
    fn test_fixed_takes_first_n_chunks() {
        let results = vec![vec![
            hit("1", 0.1, "same"),
            hit("2", 0.2, "same"),
            hit("3", 0.3, "other"),
            hit("4", 0.4, "more"),
        ]];
        let ranked = rank_passages(results, CapPolicy::Fixed(3));
        let ids: Vec<_> = ranked.iter().map(|p| p.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_no_relevance_threshold() {
        let ranked = rank_passages(vec![vec![hit("far", 1.9, "distant")]], CapPolicy::default());
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_format_passages_numbers_blocks() {
        let passages = vec![
            RankedPassage {
                chunk_id: "1".into(),
                distance: 0.0,
                raw_text: "alpha".into(),
            },
            RankedPassage {
                chunk_id: "2".into(),
                distance: 0.1,
                raw_text: "beta".into(),
            },
        ];
        assert_eq!(format_passages(&passages), "[1]\nalpha\n\n[2]\nbeta");
    }

    #[tokio::test]
    async fn test_retriever_finds_exact_text() {
        let embedder = Arc::new(MockEmbedder::default());
        let store = Arc::new(MemoryVectorStore::new());

        let texts = ["matrices multiply row by column", "cells divide by mitosis"];
        let mut chunks = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let mut chunk = crate::vector_store::test_chunk(&format!("c_{}", i + 1), "f.pdf", i as i32, vec![]);
            chunk.embedding = embedder.embed(text).await.unwrap();
            chunk.metadata.raw_text = text.to_string();
            chunks.push(chunk);
        }
        store.add_batch(&chunks).await.unwrap();

        let retriever = Retriever::new(store, embedder).with_top_k(1);
        let passages = retriever
            .retrieve(&["cells divide by mitosis".to_string()])
            .await
            .unwrap();

        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].chunk_id, "c_2");
        assert!(passages[0].distance.abs() < 0.001);
    }
}
