//! Text embeddings for chunks and retrieval queries.
//!
//! Chunk content and every expanded query go through the same [`Embedder`],
//! so stored and query vectors share one space.

mod mock;
mod openai;

pub use mock::MockEmbedder;
pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning vectors in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every returned vector.
    fn dimensions(&self) -> usize;
}
