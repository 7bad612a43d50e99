//! Configuration module for SmartLearn.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{LecturePrompts, ParsingPrompts, Prompts, QuizPrompts, TutorPrompts};
pub use settings::{
    AnswerSettings, BucketNames, CapPolicyKind, ChunkingSettings, EmbeddingSettings,
    GeneralSettings, LectureSettings, LlmSettings, ParserKind, PromptSettings,
    RetrievalSettings, ServerSettings, Settings, StorageProvider, StorageSettings,
    VectorStoreSettings,
};
