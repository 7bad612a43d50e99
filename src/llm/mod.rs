//! Chat-completion abstraction.
//!
//! Every LLM call in the pipeline goes through [`ChatModel`] so the
//! orchestration logic can be exercised with [`ScriptedChatModel`].

mod openai;
mod scripted;

pub use openai::OpenAIChatModel;
pub use scripted::ScriptedChatModel;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// An image attached to a user message.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// MIME type, e.g. "image/jpeg".
    pub mime_type: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

/// A stream of text deltas from a streamed completion.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Trait for chat-completion providers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Single completion from a system and a user message.
    async fn complete(&self, system: &str, user: &str, max_tokens: Option<u32>) -> Result<String>;

    /// Completion whose user message carries an image.
    async fn complete_with_image(&self, prompt: &str, image: &ImageInput) -> Result<String>;

    /// Streamed completion, yielding text deltas as they arrive.
    async fn stream(&self, system: &str, user: &str) -> Result<TextStream>;
}

/// Extract the outermost JSON value delimited by `open` and `close`.
///
/// Models often wrap JSON in prose or code fences; this keeps the span from
/// the first `open` to the last `close`, or the whole input if absent.
pub fn extract_json_span(response: &str, open: char, close: char) -> &str {
    match (response.find(open), response.rfind(close)) {
        (Some(start), Some(end)) if end > start => &response[start..=end],
        _ => response,
    }
}
