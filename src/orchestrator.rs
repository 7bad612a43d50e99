//! Application wiring for SmartLearn.
//!
//! Builds every pipeline from [`Settings`] and hands out shared handles to
//! the CLI and the HTTP server.

use crate::answer::AnswerOrchestrator;
use crate::chunking::Chunker;
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::ingest::{IngestOutcome, Ingestor};
use crate::jobs::{JobKind, JobQueue};
use crate::lecture::{Ffmpeg, LectureGenerator, LectureReport, MediaToolkit, OpenAISpeech, SpeechSynthesizer};
use crate::llm::{ChatModel, OpenAIChatModel};
use crate::pdf::{create_parser, VisionDescriber};
use crate::quiz::QuizGenerator;
use crate::retrieval::Retriever;
use crate::storage::{create_object_store, ensure_all_buckets, ObjectStore};
use crate::vector_store::{MemoryVectorStore, SqliteVectorStore, VectorStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// External services the pipelines are built from.
pub struct Components {
    pub chat: Arc<dyn ChatModel>,
    pub embedder: Arc<dyn Embedder>,
    pub vector_store: Arc<dyn VectorStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub media: Arc<dyn MediaToolkit>,
}

impl Components {
    /// OpenAI, the configured stores and the ffmpeg toolchain.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let chat: Arc<dyn ChatModel> = Arc::new(OpenAIChatModel::with_config(
            &settings.llm.model,
            &settings.llm.vision_model,
            settings.llm.max_tokens,
            Duration::from_secs(settings.llm.request_timeout_secs),
        )?);

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?);

        let vector_store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "memory" => {
                info!("Using in-memory vector store");
                Arc::new(MemoryVectorStore::new())
            }
            _ => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
        };

        let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(OpenAISpeech::with_config(
            &settings.lecture.tts_model,
            &settings.lecture.tts_voice,
        )?);

        Ok(Self {
            chat,
            embedder,
            vector_store,
            objects: create_object_store(settings)?,
            synthesizer,
            media: Arc::new(Ffmpeg::new()),
        })
    }
}

/// Owns the pipelines and the job queue.
pub struct Orchestrator {
    settings: Settings,
    objects: Arc<dyn ObjectStore>,
    vector_store: Arc<dyn VectorStore>,
    ingestor: Arc<Ingestor>,
    answer: Arc<AnswerOrchestrator>,
    quiz: Arc<QuizGenerator>,
    lecture: Arc<LectureGenerator>,
    jobs: JobQueue,
}

impl Orchestrator {
    /// Create an orchestrator with the default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let components = Components::from_settings(&settings)?;
        Self::with_components(settings, prompts, components)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(settings: Settings, prompts: Prompts, components: Components) -> Result<Self> {
        let Components {
            chat,
            embedder,
            vector_store,
            objects,
            synthesizer,
            media,
        } = components;

        std::fs::create_dir_all(settings.temp_dir())?;

        let parser = create_parser(settings.chunking.parser, chat.clone(), prompts.clone());
        let ingestor = Ingestor::new(
            Arc::from(parser),
            Chunker::from_settings(&settings.chunking),
            embedder.clone(),
            vector_store.clone(),
            objects.clone(),
        );

        let retriever = Arc::new(Retriever::from_settings(
            vector_store.clone(),
            embedder,
            &settings.retrieval,
        ));
        let answer = AnswerOrchestrator::new(chat.clone(), retriever)
            .with_prompts(prompts.clone())
            .with_settings(settings.answer.clone())
            .with_hyde_max_tokens(settings.llm.hyde_max_tokens);

        let quiz = QuizGenerator::new(chat.clone(), vector_store.clone()).with_prompts(prompts.clone());

        let mut lecture = LectureGenerator::new(chat.clone(), synthesizer, media, objects.clone())
            .with_settings(settings.lecture.clone())
            .with_prompts(prompts.clone())
            .with_work_root(settings.temp_dir());
        if settings.lecture.describe_images {
            lecture = lecture.with_describer(Arc::new(VisionDescriber::new(chat).with_prompts(&prompts)));
        }

        let jobs = JobQueue::new().with_retention(Duration::from_secs(settings.server.job_retention_secs));

        Ok(Self {
            settings,
            objects,
            vector_store,
            ingestor: Arc::new(ingestor),
            answer: Arc::new(answer),
            quiz: Arc::new(quiz),
            lecture: Arc::new(lecture),
            jobs,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn objects(&self) -> Arc<dyn ObjectStore> {
        self.objects.clone()
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    pub fn ingestor(&self) -> Arc<Ingestor> {
        self.ingestor.clone()
    }

    pub fn answer(&self) -> Arc<AnswerOrchestrator> {
        self.answer.clone()
    }

    pub fn quiz(&self) -> Arc<QuizGenerator> {
        self.quiz.clone()
    }

    pub fn lecture(&self) -> Arc<LectureGenerator> {
        self.lecture.clone()
    }

    pub fn jobs(&self) -> &JobQueue {
        &self.jobs
    }

    /// Create every object-storage bucket.
    pub async fn ensure_buckets(&self) -> Result<()> {
        ensure_all_buckets(self.objects.as_ref()).await
    }

    /// Ingest a PDF in the foreground.
    pub async fn ingest(&self, pdf: &[u8], filename: &str) -> Result<IngestOutcome> {
        self.ingestor.ingest(pdf, filename).await
    }

    /// Generate a lecture in the foreground.
    pub async fn generate_lecture(&self, pdf: &[u8], filename: &str) -> Result<LectureReport> {
        self.lecture.generate(pdf, filename).await
    }

    /// Queue an ingestion job.
    #[instrument(skip(self, pdf), fields(bytes = pdf.len()))]
    pub async fn submit_ingest(&self, pdf: Vec<u8>, filename: String) -> Uuid {
        let ingestor = self.ingestor.clone();
        self.jobs
            .submit(JobKind::Ingest, async move {
                let outcome = ingestor.ingest(&pdf, &filename).await?;
                Ok(serde_json::to_value(outcome)?)
            })
            .await
    }

    /// Queue a lecture generation job.
    #[instrument(skip(self, pdf), fields(bytes = pdf.len()))]
    pub async fn submit_lecture(&self, pdf: Vec<u8>, filename: String) -> Uuid {
        let lecture = self.lecture.clone();
        self.jobs
            .submit(JobKind::Lecture, async move {
                let report = lecture.generate(&pdf, &filename).await?;
                Ok(serde_json::to_value(report)?)
            })
            .await
    }
}
