//! Captions for embedded slide images.

use crate::config::Prompts;
use crate::error::Result;
use crate::llm::{ChatModel, ImageInput};
use async_trait::async_trait;
use std::sync::Arc;

/// Produces a text description of an image.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe(&self, image: &ImageInput) -> Result<String>;
}

/// Describes images with a vision-capable chat model.
pub struct VisionDescriber {
    chat: Arc<dyn ChatModel>,
    prompt: String,
}

impl VisionDescriber {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self {
            chat,
            prompt: Prompts::default().lecture.describe_image,
        }
    }

    pub fn with_prompts(mut self, prompts: &Prompts) -> Self {
        self.prompt = prompts.lecture.describe_image.clone();
        self
    }
}

#[async_trait]
impl ImageDescriber for VisionDescriber {
    async fn describe(&self, image: &ImageInput) -> Result<String> {
        let description = self.chat.complete_with_image(&self.prompt, image).await?;
        Ok(description.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedChatModel;

    #[tokio::test]
    async fn test_vision_describer_trims_reply() {
        let chat = Arc::new(ScriptedChatModel::new().reply("  A bar chart of rainfall.\n"));
        let describer = VisionDescriber::new(chat.clone());
        let image = ImageInput {
            mime_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8],
        };

        assert_eq!(describer.describe(&image).await.unwrap(), "A bar chart of rainfall.");
        assert!(chat.calls()[0].user.starts_with("Describe this image"));
    }
}
