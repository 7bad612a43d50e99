//! Narration audio, one clip per slide.

use super::ffmpeg::MediaToolkit;
use super::metadata::LectureMetadata;
use crate::error::{Result, SmartLearnError};
use crate::openai::create_client;
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Text-to-speech provider returning MP3 bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// OpenAI speech endpoint.
pub struct OpenAISpeech {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    voice: String,
}

impl OpenAISpeech {
    pub fn with_config(model: &str, voice: &str) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            voice: voice.to_string(),
        })
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }

    fn speech_voice(&self) -> Voice {
        match self.voice.to_lowercase().as_str() {
            "alloy" => Voice::Alloy,
            "echo" => Voice::Echo,
            "fable" => Voice::Fable,
            "onyx" => Voice::Onyx,
            "shimmer" => Voice::Shimmer,
            _ => Voice::Nova,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeech {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(self.speech_model())
            .voice(self.speech_voice())
            .response_format(SpeechResponseFormat::Mp3)
            .build()
            .map_err(|e| SmartLearnError::OpenAI(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| SmartLearnError::OpenAI(format!("Speech API error: {}", e)))?;

        Ok(response.bytes.to_vec())
    }
}

/// A narration clip on disk.
#[derive(Debug, Clone, Serialize)]
pub struct AudioClip {
    /// 1-based slide number.
    pub slide: u32,
    /// File name, also the key suffix in the audio bucket.
    pub filename: String,
    pub path: PathBuf,
    pub duration: f64,
    /// True when the clip is a silence placeholder.
    pub silent: bool,
}

/// Produces one clip per slide, substituting silence for missing narration.
pub struct AudioGenerator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    media: Arc<dyn MediaToolkit>,
    silence_seconds: f64,
}

impl AudioGenerator {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, media: Arc<dyn MediaToolkit>) -> Self {
        Self {
            synthesizer,
            media,
            silence_seconds: 1.0,
        }
    }

    pub fn with_silence_seconds(mut self, seconds: f64) -> Self {
        self.silence_seconds = seconds;
        self
    }

    /// Write a clip for every slide into `dir` and record object names.
    ///
    /// Synthesis failures, and failures to write the synthesized bytes, fall
    /// back to silence. Failing to write the silence or to measure a clip is
    /// fatal.
    #[instrument(skip_all, fields(slides = metadata.slides.len()))]
    pub async fn generate(&self, metadata: &mut LectureMetadata, dir: &Path) -> Result<Vec<AudioClip>> {
        tokio::fs::create_dir_all(dir).await?;
        let mut clips = Vec::with_capacity(metadata.slides.len());

        for slide in metadata.slides.iter_mut() {
            let filename = format!("slide_{}.mp3", slide.number);
            let path = dir.join(&filename);
            let script = slide.script.as_deref().unwrap_or_default().trim();

            let spoken = if script.is_empty() {
                debug!("Slide {} has no script", slide.number);
                false
            } else {
                match self.synthesizer.synthesize(script).await {
                    Ok(bytes) if !bytes.is_empty() => match tokio::fs::write(&path, bytes).await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("Could not write speech for slide {}: {}", slide.number, e);
                            false
                        }
                    },
                    Ok(_) => {
                        warn!("Speech for slide {} was empty", slide.number);
                        false
                    }
                    Err(e) => {
                        warn!("Speech for slide {} failed: {}", slide.number, e);
                        false
                    }
                }
            };

            if !spoken {
                self.media.write_silence(&path, self.silence_seconds).await?;
            }

            let duration = self.media.measure_duration(&path).await?;
            let object = format!("{}/{}", metadata.folder, filename);
            slide.audio_object = Some(object.clone());
            metadata.audio_objects.push(object);

            clips.push(AudioClip {
                slide: slide.number,
                filename,
                path,
                duration,
                silent: !spoken,
            });
        }

        info!(
            "Generated {} clips ({} silent)",
            clips.len(),
            clips.iter().filter(|c| c.silent).count()
        );
        Ok(clips)
    }
}
