//! Deterministic embedder for tests.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Produces unit-length vectors seeded from a hash of the text.
///
/// Equal texts map to equal vectors, so an exact-text query always has
/// distance zero to the stored chunk.
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(32)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let bits = hasher.finish();
            embedding.push((bits % 2000) as f32 / 1000.0 - 1.0);
        }

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embed_deterministic_and_normalized() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("photosynthesis").await.unwrap();
        let b = embedder.embed("photosynthesis").await.unwrap();
        let c = embedder.embed("mitosis").await.unwrap();

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }
}
