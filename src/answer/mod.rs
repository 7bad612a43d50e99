//! Answer orchestration for tutor questions.
//!
//! A question is classified, and knowledge questions go through query
//! expansion, retrieval and a streamed completion. The caller receives plain
//! text deltas; failures inside the pipeline arrive as text too, so a
//! consumer never sees a broken stream.

mod pacing;

pub use pacing::Pacer;

use crate::config::{AnswerSettings, Prompts};
use crate::error::{Result, SmartLearnError};
use crate::llm::{extract_json_span, ChatModel};
use crate::retrieval::{format_passages, Retriever};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Stream of answer text handed to HTTP and CLI consumers.
pub type AnswerStream = BoxStream<'static, String>;

/// Outcome of question classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// Needs subject knowledge.
    Knowledge,
    /// Greeting or small talk.
    Greeting,
    /// The classifier said neither.
    Unclassified,
}

impl QuestionKind {
    /// Interpret the classifier reply.
    pub fn from_reply(reply: &str) -> Self {
        let reply = reply.trim().to_lowercase();
        if reply.contains("true") {
            QuestionKind::Knowledge
        } else if reply.contains("false") {
            QuestionKind::Greeting
        } else {
            QuestionKind::Unclassified
        }
    }

    /// Unclassified questions are answered from the material.
    pub fn uses_material(&self) -> bool {
        !matches!(self, QuestionKind::Greeting)
    }
}

#[derive(Debug, Deserialize)]
struct Expansion {
    summary: String,
    #[serde(default)]
    items: Vec<String>,
}

fn parse_expansion(reply: &str) -> Option<Expansion> {
    let span = extract_json_span(reply, '{', '}');
    serde_json::from_str(span)
        .or_else(|_| serde_json::from_str(&span.replace('\'', "\"")))
        .ok()
}

/// Coordinates classification, expansion, retrieval and streaming.
pub struct AnswerOrchestrator {
    chat: Arc<dyn ChatModel>,
    retriever: Arc<Retriever>,
    prompts: Prompts,
    settings: AnswerSettings,
    hyde_max_tokens: u32,
}

impl AnswerOrchestrator {
    pub fn new(chat: Arc<dyn ChatModel>, retriever: Arc<Retriever>) -> Self {
        Self {
            chat,
            retriever,
            prompts: Prompts::default(),
            settings: AnswerSettings::default(),
            hyde_max_tokens: 150,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_settings(mut self, settings: AnswerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Token budget of the hypothetical passage.
    pub fn with_hyde_max_tokens(mut self, max_tokens: u32) -> Self {
        self.hyde_max_tokens = max_tokens;
        self
    }

    /// Decide whether a question needs the course material.
    #[instrument(skip(self))]
    pub async fn classify(&self, question: &str) -> Result<QuestionKind> {
        let reply = self
            .chat
            .complete(&self.prompts.tutor.classify, question, None)
            .await?;
        let kind = QuestionKind::from_reply(&reply);
        if kind == QuestionKind::Unclassified {
            warn!("Classifier gave no verdict ({:?}), treating as knowledge question", reply);
        }
        debug!("Question classified as {:?}", kind);
        Ok(kind)
    }

    /// Build the retrieval queries for a question.
    ///
    /// The first query is a hypothetical answer passage, followed by a
    /// summary of the question and the entities it mentions.
    #[instrument(skip(self))]
    pub async fn expand_query(&self, question: &str) -> Result<Vec<String>> {
        let hypothetical = self
            .chat
            .complete(
                &self.prompts.tutor.hypothetical,
                question,
                Some(self.hyde_max_tokens),
            )
            .await?;

        let reply = self
            .chat
            .complete(&self.prompts.tutor.expand, question, None)
            .await?;

        let mut queries = vec![hypothetical];
        match parse_expansion(&reply) {
            Some(expansion) => {
                queries.push(expansion.summary);
                queries.extend(expansion.items);
            }
            None => {
                warn!("Could not parse query expansion, using the question itself");
                queries.push(question.to_string());
            }
        }
        queries.retain(|q| !q.trim().is_empty());

        debug!("Expanded into {} queries", queries.len());
        Ok(queries)
    }

    /// Answer a question as a paced text stream.
    ///
    /// The work runs on a spawned task. Dropping the stream stops it at the
    /// next emitted character, and no further model calls are made.
    pub fn answer(self: &Arc<Self>, question: &str) -> AnswerStream {
        let (tx, rx) = mpsc::unbounded();
        let orchestrator = Arc::clone(self);
        let question = question.to_string();

        tokio::spawn(async move {
            orchestrator.run(&question, tx).await;
        });

        rx.boxed()
    }

    /// Collect the whole streamed answer into one string.
    pub async fn answer_text(self: &Arc<Self>, question: &str) -> String {
        self.answer(question).collect::<Vec<_>>().await.concat()
    }

    #[instrument(skip(self, tx))]
    async fn run(&self, question: &str, tx: UnboundedSender<String>) {
        info!("Answering question");
        let answer_pacer = Pacer::new(tx.clone(), Duration::from_millis(self.settings.answer_delay_ms));
        let slow_pacer = Pacer::new(tx, Duration::from_millis(self.settings.followup_delay_ms));

        let kind = match self.classify(question).await {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Classification failed: {}", e);
                slow_pacer.emit_words(&error_text(&e)).await;
                return;
            }
        };
        if slow_pacer.is_closed() {
            debug!("Client went away after classification");
            return;
        }

        let outcome = if kind.uses_material() {
            self.answer_from_material(question, &answer_pacer, &slow_pacer)
                .await
        } else {
            self.greet(question, &slow_pacer).await
        };

        if let Err(e) = outcome {
            warn!("Answer failed: {}", e);
            slow_pacer.emit_words(&error_text(&e)).await;
        }
    }

    async fn greet(&self, question: &str, pacer: &Pacer) -> Result<()> {
        let system = self
            .prompts
            .render_with_custom(&self.prompts.tutor.greeting, &HashMap::new());
        if pacer.is_closed() {
            return Ok(());
        }
        let reply = self.chat.complete(&system, question, None).await?;
        pacer.emit_words(&reply).await;
        Ok(())
    }

    async fn answer_from_material(
        &self,
        question: &str,
        answer_pacer: &Pacer,
        followup_pacer: &Pacer,
    ) -> Result<()> {
        let queries = self.expand_query(question).await?;
        let passages = self.retriever.retrieve(&queries).await?;
        let context = format_passages(&passages);
        info!("Answering from {} passages", passages.len());

        let mut vars = HashMap::new();
        vars.insert("sentinel".to_string(), self.settings.no_data_sentinel.clone());
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context);

        let system = self
            .prompts
            .render_with_custom(&self.prompts.tutor.answer_system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.tutor.answer_user, &vars);

        if answer_pacer.is_closed() {
            debug!("Client went away before the answer");
            return Ok(());
        }
        let answer = self.collect_stream(&system, &user).await?;
        if !answer_pacer.emit_words(&answer).await {
            debug!("Client went away during the answer");
            return Ok(());
        }

        if self.mentions_sentinel(&answer) {
            info!("Material lacks the answer, suggesting a related question");
            if !followup_pacer.emit_raw("\n").await {
                return Ok(());
            }

            let system = self
                .prompts
                .render_with_custom(&self.prompts.tutor.related_system, &vars);
            let user = self
                .prompts
                .render_with_custom(&self.prompts.tutor.related_user, &vars);
            let related = self.collect_stream(&system, &user).await?;
            followup_pacer.emit_words(&related).await;
        }

        Ok(())
    }

    async fn collect_stream(&self, system: &str, user: &str) -> Result<String> {
        let mut stream = self.chat.stream(system, user).await?;
        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            text.push_str(&delta?);
        }
        if text.is_empty() {
            return Err(SmartLearnError::Answer("Empty response from LLM".to_string()));
        }
        Ok(text)
    }

    fn mentions_sentinel(&self, answer: &str) -> bool {
        let sentinel = self.settings.no_data_sentinel.trim().to_lowercase();
        !sentinel.is_empty() && answer.to_lowercase().contains(&sentinel)
    }
}

fn error_text(e: &SmartLearnError) -> String {
    format!("Error processing question: {}", e)
}
