//! Page text to header-structured markdown.

use super::text::split_title;
use crate::config::{ParserKind, Prompts};
use crate::error::Result;
use crate::llm::ChatModel;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Converts extracted page texts into one markdown document.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn to_markdown(&self, pages: &[String], filename: &str) -> Result<String>;
}

/// Promotes each page's first line to a `##` heading.
#[derive(Debug, Default, Clone)]
pub struct TextParser;

impl TextParser {
    pub fn new() -> Self {
        Self
    }

    fn page_markdown(text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let (title, body) = split_title(text);
        let body = body.trim();
        Some(if body.is_empty() {
            format!("## {}", title)
        } else {
            format!("## {}\n\n{}", title, body)
        })
    }
}

#[async_trait]
impl DocumentParser for TextParser {
    async fn to_markdown(&self, pages: &[String], _filename: &str) -> Result<String> {
        Ok(pages
            .iter()
            .filter_map(|p| Self::page_markdown(p))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Asks the chat model to transcribe each page into markdown.
pub struct LlmParser {
    chat: Arc<dyn ChatModel>,
    prompts: Prompts,
}

impl LlmParser {
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

    fn strip_fences(reply: &str) -> &str {
        let trimmed = reply.trim();
        let Some(inner) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        let inner = inner.strip_prefix("markdown").unwrap_or(inner);
        inner.strip_suffix("```").unwrap_or(inner).trim()
    }
}

#[async_trait]
impl DocumentParser for LlmParser {
    async fn to_markdown(&self, pages: &[String], filename: &str) -> Result<String> {
        info!("Transcribing {} pages of {}", pages.len(), filename);
        let mut parts = Vec::new();

        for (i, text) in pages.iter().enumerate() {
            if text.trim().is_empty() {
                continue;
            }

            let mut vars = HashMap::new();
            vars.insert("page".to_string(), (i + 1).to_string());
            vars.insert("filename".to_string(), filename.to_string());
            vars.insert("text".to_string(), text.clone());

            let system = self.prompts.render_with_custom(&self.prompts.parsing.system, &vars);
            let user = self.prompts.render_with_custom(&self.prompts.parsing.user, &vars);

            match self.chat.complete(&system, &user, None).await {
                Ok(reply) => parts.push(Self::strip_fences(&reply).to_string()),
                Err(e) => {
                    warn!("Page {} transcription failed, using plain text: {}", i + 1, e);
                    if let Some(fallback) = TextParser::page_markdown(text) {
                        parts.push(fallback);
                    }
                }
            }
            debug!("Transcribed page {}", i + 1);
        }

        Ok(parts.join("\n\n"))
    }
}

/// Build the configured parser.
pub fn create_parser(kind: ParserKind, chat: Arc<dyn ChatModel>, prompts: Prompts) -> Box<dyn DocumentParser> {
    match kind {
        ParserKind::Llm => Box::new(LlmParser::new(chat).with_prompts(prompts)),
        ParserKind::Text => Box::new(TextParser::new()),
    }
}
