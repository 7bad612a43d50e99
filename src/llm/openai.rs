//! OpenAI chat-completion implementation.

use super::{ChatModel, ImageInput, TextStream};
use crate::error::{Result, SmartLearnError};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
};
use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI-backed chat model.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    vision_model: String,
    default_max_tokens: u32,
}

impl OpenAIChatModel {
    /// Create a chat model with explicit model names and token budget.
    pub fn with_config(
        model: &str,
        vision_model: &str,
        default_max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            vision_model: vision_model.to_string(),
            default_max_tokens,
        })
    }

    fn messages(system: &str, user: &str) -> Result<Vec<ChatCompletionRequestMessage>> {
        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| SmartLearnError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user.to_string())
                .build()
                .map_err(|e| SmartLearnError::OpenAI(e.to_string()))?
                .into(),
        ])
    }

    async fn run(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
        max_tokens: u32,
    ) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .max_tokens(max_tokens)
            .build()
            .map_err(|e| SmartLearnError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SmartLearnError::OpenAI(format!("Chat completion failed: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| SmartLearnError::OpenAI("Empty response from LLM".to_string()))
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, system, user))]
    async fn complete(&self, system: &str, user: &str, max_tokens: Option<u32>) -> Result<String> {
        let messages = Self::messages(system, user)?;
        let answer = self
            .run(&self.model, messages, max_tokens.unwrap_or(self.default_max_tokens))
            .await?;
        debug!("Completion returned {} chars", answer.len());
        Ok(answer)
    }

    #[instrument(skip(self, prompt, image), fields(mime = %image.mime_type, bytes = image.data.len()))]
    async fn complete_with_image(&self, prompt: &str, image: &ImageInput) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image.data);
        let data_url = format!("data:{};base64,{}", image.mime_type, encoded);

        let parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(prompt.to_string())
                .build()
                .map_err(|e| SmartLearnError::OpenAI(e.to_string()))?
                .into(),
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(
                    ImageUrlArgs::default()
                        .url(data_url)
                        .detail(ImageDetail::Low)
                        .build()
                        .map_err(|e| SmartLearnError::OpenAI(e.to_string()))?,
                )
                .build()
                .map_err(|e| SmartLearnError::OpenAI(e.to_string()))?
                .into(),
        ];

        let messages: Vec<ChatCompletionRequestMessage> = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(parts)
            .build()
            .map_err(|e| SmartLearnError::OpenAI(e.to_string()))?
            .into()];

        self.run(&self.vision_model, messages, self.default_max_tokens)
            .await
    }

    #[instrument(skip(self, system, user))]
    async fn stream(&self, system: &str, user: &str) -> Result<TextStream> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(Self::messages(system, user)?)
            .stream(true)
            .build()
            .map_err(|e| SmartLearnError::OpenAI(e.to_string()))?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| SmartLearnError::OpenAI(format!("Streamed completion failed: {}", e)))?;

        let deltas = stream.filter_map(|item| async move {
            match item {
                Ok(response) => response
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content)
                    .map(Ok),
                Err(e) => Some(Err(SmartLearnError::OpenAI(format!("Stream error: {}", e)))),
            }
        });

        Ok(deltas.boxed())
    }
}
