//! Multiple-choice quiz generation from indexed documents.

use crate::config::Prompts;
use crate::error::{Result, SmartLearnError};
use crate::llm::{extract_json_span, ChatModel};
use crate::vector_store::{DocumentChunk, VectorStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuizItem {
    /// Four options, one of which is exactly the correct answer.
    pub fn is_valid(&self) -> bool {
        self.options.len() == 4 && self.options.iter().any(|o| o == &self.correct_answer)
    }
}

/// One entry of a generated quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuizRecord {
    Item(QuizItem),
    /// A block whose questions could not be generated.
    Error { error: String },
}

/// Group adjacent chunks that share a header path into quiz blocks.
///
/// Each block is the section text of its chunks, headed by the document
/// name and section titles.
pub fn group_blocks(chunks: &[DocumentChunk]) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&DocumentChunk> = Vec::new();

    for chunk in chunks {
        if let Some(last) = current.last() {
            if !last.metadata.same_section(&chunk.metadata)
                || last.metadata.filename != chunk.metadata.filename
            {
                blocks.push(render_block(&current));
                current.clear();
            }
        }
        current.push(chunk);
    }
    if !current.is_empty() {
        blocks.push(render_block(&current));
    }

    blocks
}

fn render_block(chunks: &[&DocumentChunk]) -> String {
    let Some(first) = chunks.first() else {
        return String::new();
    };

    let mut texts: Vec<&str> = Vec::new();
    for chunk in chunks {
        let raw = chunk.metadata.raw_text.as_str();
        if !texts.contains(&raw) {
            texts.push(raw);
        }
    }

    let titles: Vec<&str> = first.metadata.headers.iter().map(|h| h.title.as_str()).collect();
    let heading = if titles.is_empty() {
        format!("Document {}", first.metadata.filename)
    } else {
        format!("Document {}, {}", first.metadata.filename, titles.join(" > "))
    };

    format!("{}\n\n{}", heading, texts.join("\n\n"))
}

/// Parse a model reply into quiz items, dropping invalid ones.
pub fn parse_quiz(reply: &str) -> Result<Vec<QuizItem>> {
    let span = extract_json_span(reply, '[', ']');
    let items: Vec<QuizItem> = serde_json::from_str(span).map_err(|e| {
        SmartLearnError::Quiz(format!(
            "Failed to parse quiz response: {}. Response was: {}",
            e,
            reply.chars().take(300).collect::<String>()
        ))
    })?;

    let total = items.len();
    let valid: Vec<QuizItem> = items.into_iter().filter(QuizItem::is_valid).collect();
    if valid.len() < total {
        warn!("Dropped {} quiz items without a matching correct answer", total - valid.len());
    }
    Ok(valid)
}

/// Generates quizzes from the chunks of indexed files.
pub struct QuizGenerator {
    chat: Arc<dyn ChatModel>,
    vector_store: Arc<dyn VectorStore>,
    prompts: Prompts,
}

impl QuizGenerator {
    pub fn new(chat: Arc<dyn ChatModel>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            chat,
            vector_store,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Generate quiz records for the given files.
    ///
    /// A block that fails produces one error record; the other blocks are
    /// still returned.
    #[instrument(skip(self))]
    pub async fn generate(&self, filenames: &[String]) -> Result<Vec<QuizRecord>> {
        let mut blocks = Vec::new();
        for filename in filenames {
            let chunks = self.vector_store.get_by_filename(filename).await?;
            if chunks.is_empty() {
                warn!("No indexed chunks for {}", filename);
            }
            blocks.extend(group_blocks(&chunks));
        }

        info!("Generating quiz from {} blocks", blocks.len());

        let mut records = Vec::new();
        for block in &blocks {
            match self.generate_block(block).await {
                Ok(items) => records.extend(items.into_iter().map(QuizRecord::Item)),
                Err(e) => {
                    warn!("Quiz block failed: {}", e);
                    records.push(QuizRecord::Error {
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(records)
    }

    async fn generate_block(&self, block: &str) -> Result<Vec<QuizItem>> {
        let mut vars = HashMap::new();
        vars.insert("content".to_string(), block.to_string());

        let system = self.prompts.render_with_custom(&self.prompts.quiz.system, &vars);
        let user = self.prompts.render_with_custom(&self.prompts.quiz.user, &vars);

        let reply = self.chat.complete(&system, &user, None).await?;
        parse_quiz(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedChatModel;
    use crate::vector_store::{test_chunk, HeaderLevel, MemoryVectorStore};

    const GOOD_REPLY: &str = r#"Here you go:
```json
[
  {"question": "What is 2+2?", "options": ["3", "4", "5", "6"], "correct_answer": "4"},
  {"question": "Broken", "options": ["a", "b", "c", "d"], "correct_answer": "e"}
]
```"#;

    #[test]
    fn test_parse_quiz_drops_unmatched_answers() {
        let items = parse_quiz(GOOD_REPLY).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].correct_answer, "4");
        assert!(parse_quiz("I cannot do that").is_err());
    }

    #[test]
    fn test_group_blocks_merges_adjacent_same_section() {
        let mut a1 = test_chunk("1", "a.pdf", 0, vec![]);
        a1.metadata.raw_text = "section one".to_string();
        let mut a2 = test_chunk("2", "a.pdf", 1, vec![]);
        a2.metadata.raw_text = "section one".to_string();
        let mut b = test_chunk("3", "a.pdf", 2, vec![]);
        b.metadata.headers = vec![HeaderLevel {
            level: 2,
            title: "Other".to_string(),
        }];
        b.metadata.raw_text = "section two".to_string();

        let blocks = group_blocks(&[a1, a2, b]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "Document a.pdf, Intro\n\nsection one");
        assert!(blocks[1].ends_with("section two"));
    }

    #[test]
    fn test_records_serialize_flat() {
        let records = vec![
            QuizRecord::Item(QuizItem {
                question: "q".into(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: "a".into(),
            }),
            QuizRecord::Error {
                error: "bad".into(),
            },
        ];
        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(json[0]["correct_answer"], "a");
        assert_eq!(json[1]["error"], "bad");
    }

    #[tokio::test]
    async fn test_bad_block_yields_one_error_record() {
        let store = Arc::new(MemoryVectorStore::new());
        let mut first = test_chunk("1", "bio.pdf", 0, vec![0.0]);
        first.metadata.raw_text = "cells".to_string();
        let mut second = test_chunk("2", "bio.pdf", 1, vec![0.0]);
        second.metadata.headers.clear();
        second.metadata.raw_text = "genes".to_string();
        store.add_batch(&[first, second]).await.unwrap();

        let chat = Arc::new(ScriptedChatModel::new().reply("not json at all").reply(GOOD_REPLY));
        let generator = QuizGenerator::new(chat, store);

        let records = generator.generate(&["bio.pdf".to_string()]).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], QuizRecord::Error { .. }));
        assert!(matches!(records[1], QuizRecord::Item(_)));
    }

    #[tokio::test]
    async fn test_unknown_file_yields_no_records() {
        let generator = QuizGenerator::new(
            Arc::new(ScriptedChatModel::new()),
            Arc::new(MemoryVectorStore::new()),
        );
        let records = generator.generate(&["missing.pdf".to_string()]).await.unwrap();
        assert!(records.is_empty());
    }
}
