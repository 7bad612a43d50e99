//! OpenAI embeddings.

use super::Embedder;
use crate::error::{Result, SmartLearnError};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, Embedding, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Inputs sent per embeddings request.
const BATCH_SIZE: usize = 100;

/// The API rejects empty strings; pages without text still need a vector.
const EMPTY_PLACEHOLDER: &str = " ";

pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn with_config(model: &str, dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(SmartLearnError::Config(
                "embedding.dimensions must be positive".to_string(),
            ));
        }
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            dimensions,
        })
    }

    async fn request(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = inputs.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(inputs))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| SmartLearnError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| SmartLearnError::OpenAI(format!("Embedding API error: {}", e)))?;

        in_input_order(response.data, expected)
    }
}

/// Vectors ordered by their request index, checked to be complete.
fn in_input_order(mut data: Vec<Embedding>, expected: usize) -> Result<Vec<Vec<f32>>> {
    data.sort_by_key(|e| e.index);
    let complete = data.len() == expected
        && data.iter().enumerate().all(|(i, e)| e.index as usize == i);
    if !complete {
        return Err(SmartLearnError::Embedding(format!(
            "Expected {} embeddings, got {}",
            expected,
            data.len()
        )));
    }
    Ok(data.into_iter().map(|e| e.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| SmartLearnError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let inputs = batch
                .iter()
                .map(|t| {
                    if t.trim().is_empty() {
                        EMPTY_PLACEHOLDER.to_string()
                    } else {
                        t.clone()
                    }
                })
                .collect();
            vectors.extend(self.request(inputs).await?);
        }

        debug!("Embedded {} texts with {}", vectors.len(), self.model);
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
