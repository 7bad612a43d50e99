//! Per-slide narration scripts.

use super::metadata::LectureMetadata;
use crate::config::Prompts;
use crate::error::Result;
use crate::llm::ChatModel;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Writes narration for every slide with the chat model.
pub struct ScriptGenerator {
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl ScriptGenerator {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self {
            chat,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Fill in each slide's script and the full lecture script.
    ///
    /// A slide whose call fails gets an empty script; the run continues.
    /// Returns the full script.
    #[instrument(skip_all, fields(slides = metadata.slides.len()))]
    pub async fn generate(&self, metadata: &mut LectureMetadata) -> String {
        let total = metadata.total_slides;

        for slide in metadata.slides.iter_mut() {
            let mut vars = HashMap::new();
            vars.insert("slide_number".to_string(), slide.number.to_string());
            vars.insert("total_slides".to_string(), total.to_string());
            vars.insert("title".to_string(), slide.title.clone());
            vars.insert("text".to_string(), slide.text.clone());
            vars.insert("tables".to_string(), slide.table_summary());
            vars.insert("images".to_string(), slide.image_summary());

            let script = match self.narrate(&vars).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Script for slide {} failed: {}", slide.number, e);
                    String::new()
                }
            };
            slide.script = Some(script);
        }

        let full = full_script(metadata);
        metadata.script = Some(full.clone());
        info!("Generated script ({} chars)", full.len());
        full
    }

    async fn narrate(&self, vars: &HashMap<String, String>) -> Result<String> {
        let system = self
            .prompts
            .render_with_custom(&self.prompts.lecture.script_system, vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.lecture.script_user, vars);

        let reply = self.chat.complete(&system, &user, None).await?;
        Ok(reply.trim().to_string())
    }
}

/// Slide scripts joined under `Slide N: title` headings.
pub fn full_script(metadata: &LectureMetadata) -> String {
    metadata
        .slides
        .iter()
        .map(|s| {
            format!(
                "Slide {}: {}\n\n{}",
                s.number,
                s.title,
                s.script.as_deref().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lecture::SlideMetadata;
    use crate::llm::ScriptedChatModel;

    fn deck() -> LectureMetadata {
        let slides = (1..=3)
            .map(|n| SlideMetadata {
                number: n,
                title: format!("Topic {n}"),
                text: format!("Text of slide {n}"),
                tables: Vec::new(),
                images: Vec::new(),
                script: None,
                audio_object: None,
            })
            .collect();
        LectureMetadata::new("deck.pdf", "deck_1", slides)
    }

    #[tokio::test]
    async fn test_failed_slide_gets_empty_script() {
        let chat = Arc::new(
            ScriptedChatModel::new()
                .reply("  Welcome to topic one. ")
                .fail("rate limited")
                .reply("Topic three closes the lecture."),
        );
        let generator = ScriptGenerator::new(chat.clone());
        let mut meta = deck();

        let full = generator.generate(&mut meta).await;

        assert_eq!(meta.slides[0].script.as_deref(), Some("Welcome to topic one."));
        assert_eq!(meta.slides[1].script.as_deref(), Some(""));
        assert!(full.starts_with("Slide 1: Topic 1\n\nWelcome to topic one."));
        assert!(full.contains("Slide 2: Topic 2"));
        assert_eq!(meta.script.as_deref(), Some(full.as_str()));

        let calls = chat.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[2].user.contains("Slide 3 of 3: Topic 3"));
    }
}
