//! SmartLearn - AI tutoring over lecture slides
//!
//! Turns PDF course material into a question-answering tutor, a quiz
//! generator and narrated lecture videos.
//!
//! # Overview
//!
//! SmartLearn allows you to:
//! - Index PDFs into a vector store of header-aware chunks
//! - Ask questions and stream answers grounded in the indexed material
//! - Generate multiple-choice quizzes from indexed files
//! - Turn a slide deck into a script, per-slide narration and an MP4 video
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `pdf` - Page text, slide, table and image extraction
//! - `chunking` - Markdown header splitting and size-bounded chunks
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `storage` - Object storage buckets (local or S3)
//! - `ingest` - Upload, index and delete PDFs
//! - `retrieval` - Query expansion, search and passage capping
//! - `answer` - Streaming tutor answers with follow-up prompts
//! - `quiz` - Multiple-choice question generation
//! - `lecture` - Script, narration and video generation
//! - `jobs` - Background job tracking
//! - `orchestrator` - Pipeline wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use smartlearn::config::Settings;
//! use smartlearn::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!     orchestrator.ensure_buckets().await?;
//!
//!     let pdf = std::fs::read("calculus.pdf")?;
//!     let outcome = orchestrator.ingest(&pdf, "calculus.pdf").await?;
//!     println!("Indexed {} chunks", outcome.chunks_indexed);
//!
//!     let answer = orchestrator.answer().answer_text("What is a derivative?").await;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod jobs;
pub mod lecture;
pub mod llm;
pub mod openai;
pub mod orchestrator;
pub mod pdf;
pub mod quiz;
pub mod retrieval;
pub mod storage;
pub mod vector_store;

pub use error::{Result, SmartLearnError};
