//! Scripted chat model for tests and offline runs.

use super::{ChatModel, ImageInput, TextStream};
use crate::error::{Result, SmartLearnError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A canned reply.
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
}

/// Chat model that replays queued replies in order.
///
/// Streamed replies are split at spaces so consumers see several deltas.
/// When the queue runs dry every call fails.
#[derive(Default)]
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()));
        self
    }

    /// Queue a failing reply.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Reply::Fail(message.into()));
        self
    }

    /// Requests seen so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    fn next(&self, system: &str, user: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                system: system.to_string(),
                user: user.to_string(),
            });
        }

        let reply = self
            .replies
            .lock()
            .map_err(|e| SmartLearnError::OpenAI(format!("Failed to acquire lock: {}", e)))?
            .pop_front();

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(SmartLearnError::OpenAI(message)),
            None => Err(SmartLearnError::OpenAI("No scripted reply left".to_string())),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, system: &str, user: &str, _max_tokens: Option<u32>) -> Result<String> {
        self.next(system, user)
    }

    async fn complete_with_image(&self, prompt: &str, _image: &ImageInput) -> Result<String> {
        self.next("", prompt)
    }

    async fn stream(&self, system: &str, user: &str) -> Result<TextStream> {
        let text = self.next(system, user)?;
        let pieces: Vec<Result<String>> = text
            .split_inclusive(' ')
            .map(|p| Ok(p.to_string()))
            .collect();
        Ok(stream::iter(pieces).boxed())
    }
}
