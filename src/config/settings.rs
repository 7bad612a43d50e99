//! Configuration settings for SmartLearn.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub answer: AnswerSettings,
    pub storage: StorageSettings,
    pub lecture: LectureSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.smartlearn".to_string(),
            temp_dir: "/tmp/smartlearn".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Chat model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model used for classification, answers, quizzes and scripts.
    pub model: String,
    /// Output token budget for ordinary completions.
    pub max_tokens: u32,
    /// Output token budget for the hypothetical-document passage.
    pub hyde_max_tokens: u32,
    /// Model used to caption slide images.
    pub vision_model: String,
    /// Timeout for a single API request.
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4085,
            hyde_max_tokens: 150,
            vision_model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// How page text is turned into header-structured markdown before chunking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// Ask the chat model to transcribe each page to markdown.
    #[default]
    Llm,
    /// Promote each page's first line to a heading, no API calls.
    Text,
}

impl std::str::FromStr for ParserKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "llm" => Ok(ParserKind::Llm),
            "text" => Ok(ParserKind::Text),
            _ => Err(format!("Unknown parser: {}", s)),
        }
    }
}

/// Document chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Page-to-markdown parser.
    pub parser: ParserKind,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            parser: ParserKind::Llm,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.smartlearn/chunks.db".to_string(),
        }
    }
}

/// How the ranked passage list is capped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CapPolicyKind {
    /// Collect unique raw passages until `max_passages` is reached.
    #[default]
    Accumulate,
    /// Take the first `max_passages` ranked entries.
    Fixed,
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Nearest neighbours fetched per expanded query.
    pub top_k: usize,
    /// Maximum passages handed to the answer model.
    pub max_passages: usize,
    /// Capping policy.
    pub cap_policy: CapPolicyKind,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            max_passages: 20,
            cap_policy: CapPolicyKind::Accumulate,
        }
    }
}

/// Streamed answer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    /// Delay between characters of the main answer.
    pub answer_delay_ms: u64,
    /// Delay between characters of greetings, follow-ups and errors.
    pub followup_delay_ms: u64,
    /// Phrase the answer model emits when the passages do not cover the question.
    pub no_data_sentinel: String,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            answer_delay_ms: 1,
            followup_delay_ms: 10,
            no_data_sentinel: "the provided material does not contain information about this"
                .to_string(),
        }
    }
}

/// Object storage provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    /// Directory per bucket on the local filesystem.
    #[default]
    Local,
    /// S3-compatible service such as MinIO.
    S3,
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub provider: StorageProvider,
    /// Root directory for the local provider.
    pub local_root: String,
    /// Endpoint URL for the S3 provider (e.g. "http://minio:9000").
    pub endpoint: String,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub buckets: BucketNames,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Local,
            local_root: "~/.smartlearn/objects".to_string(),
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
            buckets: BucketNames::default(),
        }
    }
}

impl StorageSettings {
    /// Access key, preferring the environment over the config file.
    pub fn resolved_access_key(&self) -> Option<String> {
        std::env::var("SMARTLEARN_S3_ACCESS_KEY")
            .ok()
            .or_else(|| self.access_key.clone())
    }

    /// Secret key, preferring the environment over the config file.
    pub fn resolved_secret_key(&self) -> Option<String> {
        std::env::var("SMARTLEARN_S3_SECRET_KEY")
            .ok()
            .or_else(|| self.secret_key.clone())
    }
}

/// Bucket names per asset type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketNames {
    pub files: String,
    pub slides: String,
    pub videos: String,
    pub audio: String,
    pub scripts: String,
    pub metadata: String,
}

impl Default for BucketNames {
    fn default() -> Self {
        Self {
            files: "files".to_string(),
            slides: "slides".to_string(),
            videos: "videos".to_string(),
            audio: "audios".to_string(),
            scripts: "scripts".to_string(),
            metadata: "metadata".to_string(),
        }
    }
}

/// Lecture generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LectureSettings {
    /// Output video frame rate.
    pub fps: u32,
    /// Resolution used when rasterizing slides.
    pub render_dpi: u32,
    /// Length of the silent clip substituted for missing narration.
    pub silence_seconds: f64,
    /// Text-to-speech model.
    pub tts_model: String,
    /// Text-to-speech voice.
    pub tts_voice: String,
    /// Caption embedded slide images with the vision model.
    pub describe_images: bool,
}

impl Default for LectureSettings {
    fn default() -> Self {
        Self {
            fps: 24,
            render_dpi: 150,
            silence_seconds: 1.0,
            tts_model: "tts-1".to_string(),
            tts_voice: "nova".to_string(),
            describe_images: false,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS; "*" allows any.
    pub allowed_origin: String,
    /// Seconds a finished job stays available to `/task_status`.
    pub job_retention_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origin: "http://localhost:3000".to_string(),
            job_retention_secs: 24 * 60 * 60,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SmartLearnError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("smartlearn")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded root of the local object store.
    pub fn local_storage_root(&self) -> PathBuf {
        Self::expand_path(&self.storage.local_root)
    }
}
