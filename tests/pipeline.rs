//! End-to-end runs of the offline pipeline: ingest, tutor answers,
//! quizzes, deletion and lecture generation.

use async_trait::async_trait;
use futures::StreamExt;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use smartlearn::config::{BucketNames, ParserKind, Prompts, Settings};
use smartlearn::embedding::{Embedder, MockEmbedder};
use smartlearn::lecture::{MediaToolkit, SpeechSynthesizer};
use smartlearn::llm::ScriptedChatModel;
use smartlearn::orchestrator::{Components, Orchestrator};
use smartlearn::quiz::QuizRecord;
use smartlearn::retrieval::Retriever;
use smartlearn::storage::{Bucket, LocalObjectStore, ObjectStore};
use smartlearn::vector_store::{MemoryVectorStore, VectorStore};
use smartlearn::{Result, SmartLearnError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

/// One page per entry, each page a list of text lines.
fn build_pdf(pages: &[&[&str]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![50.into(), (750 - 20 * i as i64).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Narration lasting one second per word, written as plain text.
struct WordClock;

#[async_trait]
impl SpeechSynthesizer for WordClock {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        Ok(text.split_whitespace().count().to_string().into_bytes())
    }
}

/// Media toolkit that writes text stand-ins instead of images and audio.
struct TextMedia;

#[async_trait]
impl MediaToolkit for TextMedia {
    async fn render_slides(&self, pdf: &Path, out_dir: &Path, _dpi: u32) -> Result<Vec<PathBuf>> {
        let pages = Document::load(pdf)?.get_pages().len();
        std::fs::create_dir_all(out_dir)?;
        let mut images = Vec::new();
        for page in 1..=pages {
            let path = out_dir.join(format!("slide-{}.png", page));
            std::fs::write(&path, b"png")?;
            images.push(path);
        }
        Ok(images)
    }

    async fn measure_duration(&self, path: &Path) -> Result<f64> {
        let text = std::fs::read_to_string(path)?;
        text.trim()
            .parse()
            .map_err(|_| SmartLearnError::ToolFailed(format!("not a duration: {}", text)))
    }

    async fn write_silence(&self, path: &Path, seconds: f64) -> Result<()> {
        std::fs::write(path, seconds.to_string())?;
        Ok(())
    }

    async fn concat_audio(&self, list: &Path, out: &Path) -> Result<()> {
        std::fs::copy(list, out)?;
        Ok(())
    }

    async fn mux(&self, image_list: &Path, _audio: &Path, out: &Path, _fps: u32) -> Result<()> {
        std::fs::copy(image_list, out)?;
        Ok(())
    }
}

struct Harness {
    _dir: TempDir,
    orchestrator: Orchestrator,
    objects: Arc<LocalObjectStore>,
    store: Arc<MemoryVectorStore>,
}

fn harness(chat: ScriptedChatModel) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.general.temp_dir = dir.path().join("tmp").display().to_string();
    settings.chunking.parser = ParserKind::Text;
    settings.answer.answer_delay_ms = 0;
    settings.answer.followup_delay_ms = 0;
    settings.lecture.describe_images = false;

    let objects = Arc::new(LocalObjectStore::new(dir.path().join("objects"), BucketNames::default()));
    let store = Arc::new(MemoryVectorStore::new());
    let components = Components {
        chat: Arc::new(chat),
        embedder: Arc::new(MockEmbedder::default()),
        vector_store: store.clone(),
        objects: objects.clone(),
        synthesizer: Arc::new(WordClock),
        media: Arc::new(TextMedia),
    };
    let orchestrator = Orchestrator::with_components(settings, Prompts::default(), components).unwrap();

    Harness {
        _dir: dir,
        orchestrator,
        objects,
        store,
    }
}

const SETS_PAGE: &[&str] = &["Sets", "A set is an unordered collection of distinct elements."];

#[tokio::test]
async fn test_ingest_then_reupload_is_rejected() {
    let h = harness(ScriptedChatModel::new());
    assert_ok!(h.orchestrator.ensure_buckets().await);
    let pdf = build_pdf(&[SETS_PAGE]);

    let outcome = h.orchestrator.ingest(&pdf, "sets.pdf").await.unwrap();
    assert_eq!(outcome.filename, "sets.pdf");
    assert!(outcome.chunks_indexed > 0);
    assert_eq!(h.store.count().await.unwrap(), outcome.chunks_indexed);
    assert_eq!(h.objects.get(Bucket::Files, "sets.pdf").await.unwrap(), pdf);

    let again = assert_err!(h.orchestrator.ingest(&pdf, "sets.pdf").await);
    assert!(matches!(again, SmartLearnError::AlreadyExists(_)));
    assert_eq!(h.store.count().await.unwrap(), outcome.chunks_indexed);
}

#[tokio::test]
async fn test_answer_adds_followup_when_material_lacks_it() {
    let chat = ScriptedChatModel::new()
        .reply("true")
        .reply("Functions map inputs to outputs.")
        .reply(r#"{"summary": "What a function is", "items": ["function"]}"#)
        .reply("The provided material does not contain information about this.")
        .reply("What is a set?");
    let h = harness(chat);
    assert_ok!(h.orchestrator.ensure_buckets().await);
    h.orchestrator
        .ingest(&build_pdf(&[SETS_PAGE]), "sets.pdf")
        .await
        .unwrap();

    let pieces: Vec<String> = h.orchestrator.answer().answer("What is a function?").collect().await;
    let answer = pieces.concat();

    let (first, followup) = answer.split_once('\n').unwrap();
    assert!(first.contains("does not contain information"));
    assert_eq!(followup.trim(), "What is a set?");
}

#[tokio::test]
async fn test_greeting_skips_retrieval() {
    let chat = ScriptedChatModel::new().reply("false").reply("Hello! Ask me about your course.");
    let h = harness(chat);

    let answer = h.orchestrator.answer().answer_text("hi").await;
    assert_eq!(answer, "Hello! Ask me about your course.");
}

#[tokio::test]
async fn test_quiz_from_indexed_file() {
    let chat = ScriptedChatModel::new().reply(
        r#"[{"question": "What is a set?", "options": ["A list", "A collection", "A number", "A map"], "correct_answer": "A collection"}]"#,
    );
    let h = harness(chat);
    assert_ok!(h.orchestrator.ensure_buckets().await);
    h.orchestrator
        .ingest(&build_pdf(&[SETS_PAGE]), "sets.pdf")
        .await
        .unwrap();

    let records = h
        .orchestrator
        .quiz()
        .generate(&["sets.pdf".to_string()])
        .await
        .unwrap();

    match records.first() {
        Some(QuizRecord::Item(item)) => {
            assert_eq!(item.question, "What is a set?");
            assert_eq!(item.correct_answer, "A collection");
        }
        other => panic!("expected a quiz item, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_removes_file_and_chunks() {
    let h = harness(ScriptedChatModel::new());
    assert_ok!(h.orchestrator.ensure_buckets().await);
    h.orchestrator
        .ingest(&build_pdf(&[SETS_PAGE]), "sets.pdf")
        .await
        .unwrap();

    let removed = h.orchestrator.ingestor().delete("sets.pdf").await.unwrap();
    assert!(removed.object_deleted);
    assert!(removed.chunks_deleted > 0);
    assert_eq!(h.store.count().await.unwrap(), 0);
    assert!(!h.store.has_filename("sets.pdf").await.unwrap());

    let again = assert_err!(h.orchestrator.ingestor().delete("sets.pdf").await);
    assert!(matches!(again, SmartLearnError::NotFound(_)));
}

const MATRIX_PAGE: &[&str] = &["Matrices", "A matrix is a rectangular grid of numbers."];
const CELL_PAGE: &[&str] = &["Cells", "A cell is the basic unit of living organisms."];

#[tokio::test]
async fn test_deleted_document_leaves_retrieval() {
    let h = harness(ScriptedChatModel::new());
    assert_ok!(h.orchestrator.ensure_buckets().await);
    h.orchestrator
        .ingest(&build_pdf(&[MATRIX_PAGE]), "algebra.pdf")
        .await
        .unwrap();
    h.orchestrator
        .ingest(&build_pdf(&[CELL_PAGE]), "biology.pdf")
        .await
        .unwrap();

    assert_ok!(h.orchestrator.ingestor().delete("algebra.pdf").await);

    let embedder = Arc::new(MockEmbedder::default());
    let question = "What is a matrix?";
    let hits = h
        .store
        .query(&embedder.embed(question).await.unwrap(), 50)
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|hit| hit.metadata.filename == "biology.pdf"));

    let retriever = Retriever::new(h.store.clone(), embedder);
    let passages = retriever.retrieve(&[question.to_string()]).await.unwrap();
    assert!(!passages.is_empty());
    assert!(passages.iter().all(|p| !p.raw_text.contains("matrix")));
    assert!(passages.iter().any(|p| p.raw_text.contains("basic unit")));
}

#[tokio::test]
async fn test_lecture_video_follows_narration_length() {
    let chat = ScriptedChatModel::new()
        .reply("Limits describe approach.")
        .reply("Continuity means no jumps at all.");
    let h = harness(chat);
    assert_ok!(h.orchestrator.ensure_buckets().await);
    let pdf = build_pdf(&[&["Limits", "Approaching a value"], &["Continuity", "No gaps"]]);

    let report = h
        .orchestrator
        .generate_lecture(&pdf, "analysis.pdf")
        .await
        .unwrap();

    assert_eq!(report.status, "success");
    assert!(report.folder.starts_with("analysis_"));
    assert_eq!(report.audio_files.len(), 2);

    let video = h.objects.get(Bucket::Videos, &report.video_file).await.unwrap();
    let list = String::from_utf8(video).unwrap();
    assert!(list.contains("duration 3.000000"));
    assert!(list.contains("duration 6.000000"));

    let listed = h.orchestrator.lecture().list_videos().await.unwrap();
    assert_eq!(listed, vec![report.video_file.clone()]);

    let deleted = h.orchestrator.lecture().delete(&report.folder).await.unwrap();
    assert_eq!(deleted.status, "success");
    assert!(h.orchestrator.lecture().list_videos().await.unwrap().is_empty());
}
