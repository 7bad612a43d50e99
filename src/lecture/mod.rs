//! Lecture generation: slides to narrated video.
//!
//! A run extracts every page of the PDF, writes a narration script per
//! slide, synthesizes one clip per slide, renders the pages and stitches
//! them to the clips. Every artifact is stored under one folder prefix
//! derived from the PDF name and the run time.

mod audio;
mod ffmpeg;
mod metadata;
mod script;
mod timing;
mod video;

pub use audio::{AudioClip, AudioGenerator, OpenAISpeech, SpeechSynthesizer};
pub use ffmpeg::{parse_duration_output, Ffmpeg, MediaToolkit};
pub use metadata::{folder_name, LectureMetadata, SlideImage, SlideMetadata};
pub use script::{full_script, ScriptGenerator};
pub use timing::{frame_boundaries, frame_runs, slide_for_frame, total_frames, FrameBoundary, FrameRun};
pub use video::{audio_concat_list, image_concat_list, VideoGenerator};

use crate::config::{LectureSettings, Prompts};
use crate::error::{Result, SmartLearnError};
use crate::ingest::validate_pdf_name;
use crate::llm::{ChatModel, ImageInput};
use crate::pdf::{extract_slides, ExtractedSlide, ImageDescriber};
use crate::storage::{Bucket, ObjectStore};
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Object names produced by a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct LectureReport {
    pub status: String,
    pub message: String,
    pub folder: String,
    pub metadata_file: String,
    pub script_file: String,
    pub slide_scripts: Vec<String>,
    pub slide_images: Vec<String>,
    pub audio_files: Vec<String>,
    pub video_file: String,
}

/// Objects stored for one lecture folder, per bucket.
#[derive(Debug, Clone, Serialize)]
pub struct LectureArtifacts {
    pub folder: String,
    pub metadata_file: Option<String>,
    pub video_file: Option<String>,
    pub scripts: Vec<String>,
    pub slide_images: Vec<String>,
    pub audio_files: Vec<String>,
}

impl LectureArtifacts {
    pub fn is_empty(&self) -> bool {
        self.metadata_file.is_none()
            && self.video_file.is_none()
            && self.scripts.is_empty()
            && self.slide_images.is_empty()
            && self.audio_files.is_empty()
    }

    fn objects(&self) -> Vec<(Bucket, String)> {
        let mut objects = Vec::new();
        objects.extend(self.metadata_file.iter().map(|k| (Bucket::Metadata, k.clone())));
        objects.extend(self.video_file.iter().map(|k| (Bucket::Videos, k.clone())));
        objects.extend(self.scripts.iter().map(|k| (Bucket::Scripts, k.clone())));
        objects.extend(self.slide_images.iter().map(|k| (Bucket::Slides, k.clone())));
        objects.extend(self.audio_files.iter().map(|k| (Bucket::Audio, k.clone())));
        objects
    }
}

/// Outcome of deleting a lecture folder.
#[derive(Debug, Clone, Serialize)]
pub struct DeletionReport {
    /// "success" or "partial_success".
    pub status: String,
    pub folder: String,
    pub deleted: Vec<String>,
    pub errors: Vec<String>,
}

/// Runs the whole lecture pipeline and manages its artifacts.
pub struct LectureGenerator {
    chat: Arc<dyn ChatModel>,
    describer: Option<Arc<dyn ImageDescriber>>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    media: Arc<dyn MediaToolkit>,
    objects: Arc<dyn ObjectStore>,
    settings: LectureSettings,
    prompts: Prompts,
    work_root: PathBuf,
}

impl LectureGenerator {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        media: Arc<dyn MediaToolkit>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            chat,
            describer: None,
            synthesizer,
            media,
            objects,
            settings: LectureSettings::default(),
            prompts: Prompts::default(),
            work_root: std::env::temp_dir(),
        }
    }

    /// Caption embedded images before writing scripts.
    pub fn with_describer(mut self, describer: Arc<dyn ImageDescriber>) -> Self {
        self.describer = Some(describer);
        self
    }

    pub fn with_settings(mut self, settings: LectureSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Directory under which per-run scratch directories are created.
    pub fn with_work_root(mut self, dir: PathBuf) -> Self {
        self.work_root = dir;
        self
    }

    /// Generate and store script, audio and video for a PDF.
    #[instrument(skip(self, pdf), fields(bytes = pdf.len()))]
    pub async fn generate(&self, pdf: &[u8], filename: &str) -> Result<LectureReport> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.generate_in_folder(pdf, filename, &folder_name(filename, &stamp))
            .await
    }

    /// Same as [`generate`](Self::generate) with an explicit folder prefix.
    pub async fn generate_in_folder(
        &self,
        pdf: &[u8],
        filename: &str,
        folder: &str,
    ) -> Result<LectureReport> {
        validate_pdf_name(filename)?;
        info!("Generating lecture {} from {}", folder, filename);

        let extracted = extract_slides(pdf)?;
        let mut slides = Vec::with_capacity(extracted.len());
        for slide in extracted {
            slides.push(self.store_slide(folder, slide).await?);
        }
        let mut metadata = LectureMetadata::new(filename, folder, slides);

        // Scripts
        let script_generator = ScriptGenerator::new(self.chat.clone()).with_prompts(self.prompts.clone());
        let full = script_generator.generate(&mut metadata).await;

        let script_file = format!("{folder}/{folder}.txt");
        self.objects
            .put(Bucket::Scripts, &script_file, full.as_bytes(), "text/plain")
            .await?;

        let mut slide_scripts = Vec::with_capacity(metadata.slides.len());
        for (i, slide) in metadata.slides.iter().enumerate() {
            let key = format!("{folder}/slide_{}_script.txt", i + 1);
            let text = slide.script.as_deref().unwrap_or_default();
            self.objects
                .put(Bucket::Scripts, &key, text.as_bytes(), "text/plain")
                .await?;
            slide_scripts.push(key);
        }

        // Audio
        tokio::fs::create_dir_all(&self.work_root).await?;
        let work = tempfile::Builder::new()
            .prefix("smartlearn-lecture-")
            .tempdir_in(&self.work_root)?;

        let audio_generator = AudioGenerator::new(self.synthesizer.clone(), self.media.clone())
            .with_silence_seconds(self.settings.silence_seconds);
        let clips = audio_generator
            .generate(&mut metadata, &work.path().join("audio"))
            .await?;

        for (clip, key) in clips.iter().zip(&metadata.audio_objects) {
            let bytes = tokio::fs::read(&clip.path).await?;
            self.objects.put(Bucket::Audio, key, &bytes, "audio/mpeg").await?;
        }

        // Video
        let pdf_path = work.path().join("input.pdf");
        tokio::fs::write(&pdf_path, pdf).await?;
        let images = self
            .media
            .render_slides(&pdf_path, &work.path().join("pages"), self.settings.render_dpi)
            .await?;

        let video_path = work.path().join(format!("{folder}.mp4"));
        VideoGenerator::new(self.media.clone(), self.settings.fps)
            .generate(&images, &clips, work.path(), &video_path)
            .await?;

        let video_file = format!("{folder}.mp4");
        let video = tokio::fs::read(&video_path).await?;
        self.objects
            .put(Bucket::Videos, &video_file, &video, "video/mp4")
            .await?;

        // Metadata
        let metadata_file = format!("{folder}.json");
        let json = serde_json::to_vec_pretty(&metadata)?;
        self.objects
            .put(Bucket::Metadata, &metadata_file, &json, "application/json")
            .await?;

        let slide_images = metadata
            .slides
            .iter()
            .flat_map(|s| s.images.iter().map(|i| i.object_name.clone()))
            .collect();

        info!("Lecture {} complete", folder);
        Ok(LectureReport {
            status: "success".to_string(),
            message: "Lecture generation completed successfully".to_string(),
            folder: folder.to_string(),
            metadata_file,
            script_file,
            slide_scripts,
            slide_images,
            audio_files: metadata.audio_objects.clone(),
            video_file,
        })
    }

    /// Store a page's embedded images and build its metadata.
    async fn store_slide(&self, folder: &str, slide: ExtractedSlide) -> Result<SlideMetadata> {
        let mut images = Vec::with_capacity(slide.images.len());

        for (idx, image) in slide.images.into_iter().enumerate() {
            let extension = if image.format == "jp2" { "jp2" } else { "jpg" };
            let object_name = format!("{folder}/slide_{}_{}.{extension}", slide.number, idx + 1);
            self.objects
                .put(Bucket::Slides, &object_name, &image.data, image.mime_type())
                .await?;

            let description = match (&self.describer, self.settings.describe_images) {
                (Some(describer), true) => {
                    let input = ImageInput {
                        mime_type: image.mime_type().to_string(),
                        data: image.data.clone(),
                    };
                    match describer.describe(&input).await {
                        Ok(text) => Some(text),
                        Err(e) => {
                            warn!("Could not describe {}: {}", object_name, e);
                            None
                        }
                    }
                }
                _ => None,
            };

            images.push(SlideImage {
                object_name,
                format: image.format,
                width: image.width,
                height: image.height,
                description,
            });
        }

        Ok(SlideMetadata {
            number: slide.number,
            title: slide.title,
            text: slide.content,
            tables: slide.tables,
            images,
            script: None,
            audio_object: None,
        })
    }

    /// Objects stored for a folder.
    pub async fn artifacts(&self, folder: &str) -> Result<LectureArtifacts> {
        let prefix = format!("{folder}/");
        let metadata_file = format!("{folder}.json");
        let video_file = format!("{folder}.mp4");

        Ok(LectureArtifacts {
            folder: folder.to_string(),
            metadata_file: self
                .objects
                .exists(Bucket::Metadata, &metadata_file)
                .await?
                .then_some(metadata_file),
            video_file: self
                .objects
                .exists(Bucket::Videos, &video_file)
                .await?
                .then_some(video_file),
            scripts: self.objects.list(Bucket::Scripts, &prefix).await?,
            slide_images: self.objects.list(Bucket::Slides, &prefix).await?,
            audio_files: self.objects.list(Bucket::Audio, &prefix).await?,
        })
    }

    /// Stored lecture metadata for a folder.
    pub async fn metadata(&self, folder: &str) -> Result<LectureMetadata> {
        let bytes = self
            .objects
            .get(Bucket::Metadata, &format!("{folder}.json"))
            .await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Delete every artifact of a folder across buckets.
    ///
    /// Individual failures are collected; the rest is still deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, folder: &str) -> Result<DeletionReport> {
        if folder.is_empty() || folder.contains('/') {
            return Err(SmartLearnError::InvalidInput(format!("Invalid lecture folder: {folder}")));
        }

        let artifacts = self.artifacts(folder).await?;
        if artifacts.is_empty() {
            return Err(SmartLearnError::NotFound(format!("Lecture {folder}")));
        }

        let mut deleted = Vec::new();
        let mut errors = Vec::new();
        for (bucket, key) in artifacts.objects() {
            match self.objects.delete(bucket, &key).await {
                Ok(()) => deleted.push(key),
                Err(e) => {
                    warn!("Failed to delete {}: {}", key, e);
                    errors.push(format!("{key}: {e}"));
                }
            }
        }

        let status = if errors.is_empty() { "success" } else { "partial_success" };
        info!("Deleted {} objects of {} ({})", deleted.len(), folder, status);
        Ok(DeletionReport {
            status: status.to_string(),
            folder: folder.to_string(),
            deleted,
            errors,
        })
    }

    /// Names of stored lecture videos.
    pub async fn list_videos(&self) -> Result<Vec<String>> {
        self.objects.list(Bucket::Videos, "").await
    }

    /// Bytes of a stored lecture video.
    pub async fn download_video(&self, filename: &str) -> Result<Vec<u8>> {
        self.objects.get(Bucket::Videos, filename).await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{FakeMedia, FakeSpeech};
    use super::*;
    use crate::config::BucketNames;
    use crate::llm::ScriptedChatModel;
    use crate::pdf::fixtures::{pdf_with_pages, pdf_with_pages_and_image};
    use crate::storage::LocalObjectStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        objects: Arc<LocalObjectStore>,
        generator: LectureGenerator,
    }

    fn fixture(chat: ScriptedChatModel) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let objects = Arc::new(LocalObjectStore::new(dir.path().join("objects"), BucketNames::default()));
        let generator = LectureGenerator::new(
            Arc::new(chat),
            Arc::new(FakeSpeech::new()),
            Arc::new(FakeMedia),
            objects.clone(),
        )
        .with_work_root(dir.path().join("work"));
        Fixture {
            _dir: dir,
            objects,
            generator,
        }
    }

    #[tokio::test]
    async fn test_generate_stores_every_artifact() {
        let chat = ScriptedChatModel::new()
            .reply("Derivatives measure change, one two three.")
            .fail("model overloaded");
        let f = fixture(chat);
        let pdf = pdf_with_pages(&[&["Derivatives", "Rate of change"], &["Summary", "Review"]]);

        let report = f
            .generator
            .generate_in_folder(&pdf, "calculus.pdf", "calculus_1")
            .await
            .unwrap();

        assert_eq!(report.status, "success");
        assert_eq!(report.script_file, "calculus_1/calculus_1.txt");
        assert_eq!(
            report.slide_scripts,
            vec!["calculus_1/slide_1_script.txt", "calculus_1/slide_2_script.txt"]
        );
        assert_eq!(
            report.audio_files,
            vec!["calculus_1/slide_1.mp3", "calculus_1/slide_2.mp3"]
        );
        assert_eq!(report.video_file, "calculus_1.mp4");

        // 6 words at 0.5 s, then the 1 s silence for the failed script.
        let video = f.objects.get(Bucket::Videos, "calculus_1.mp4").await.unwrap();
        let list = String::from_utf8(video).unwrap();
        assert!(list.contains("duration 3.000000"));
        assert!(list.contains("duration 1.000000"));

        let meta = f.generator.metadata("calculus_1").await.unwrap();
        assert_eq!(meta.total_slides, 2);
        assert_eq!(meta.slides[0].title, "Derivatives");
        assert_eq!(meta.slides[1].script.as_deref(), Some(""));
        assert!(meta.script.unwrap().contains("Slide 2: Summary"));
    }

    #[tokio::test]
    async fn test_embedded_images_saved_to_slides_bucket() {
        let chat = ScriptedChatModel::new().reply("Look at the figure.");
        let f = fixture(chat);
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];
        let pdf = pdf_with_pages_and_image(&[&["Figure", "A chart"]], Some(&jpeg));

        let report = f
            .generator
            .generate_in_folder(&pdf, "figs.pdf", "figs_1")
            .await
            .unwrap();

        assert_eq!(report.slide_images, vec!["figs_1/slide_1_1.jpg"]);
        let stored = f.objects.get(Bucket::Slides, "figs_1/slide_1_1.jpg").await.unwrap();
        assert_eq!(stored, jpeg);
    }

    #[tokio::test]
    async fn test_delete_removes_all_buckets() {
        let chat = ScriptedChatModel::new().reply("One.").reply("Two.");
        let f = fixture(chat);
        let pdf = pdf_with_pages(&[&["A", "a"], &["B", "b"]]);
        f.generator
            .generate_in_folder(&pdf, "ab.pdf", "ab_1")
            .await
            .unwrap();

        let artifacts = f.generator.artifacts("ab_1").await.unwrap();
        assert_eq!(artifacts.scripts.len(), 3);
        assert_eq!(artifacts.audio_files.len(), 2);

        let report = f.generator.delete("ab_1").await.unwrap();
        assert_eq!(report.status, "success");
        assert_eq!(report.deleted.len(), 7);
        assert!(report.errors.is_empty());
        assert!(f.generator.artifacts("ab_1").await.unwrap().is_empty());
        assert!(f.generator.list_videos().await.unwrap().is_empty());

        let again = f.generator.delete("ab_1").await;
        assert!(matches!(again, Err(SmartLearnError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_non_pdf_rejected() {
        let f = fixture(ScriptedChatModel::new());
        let result = f.generator.generate(b"text", "notes.txt").await;
        assert!(matches!(result, Err(SmartLearnError::InvalidInput(_))));
    }
}
