//! Error types for SmartLearn.

use thiserror::Error;

/// Library-level error type for SmartLearn operations.
///
/// Variants are grouped by origin so callers can tell configuration
/// problems, upstream provider failures and bad input apart.
#[derive(Error, Debug)]
pub enum SmartLearnError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Object storage error: {0}")]
    Storage(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Slide/audio count mismatch: {slides} slide images but {clips} audio clips")]
    SlideAudioMismatch { slides: usize, clips: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Answer generation failed: {0}")]
    Answer(String),

    #[error("Quiz generation failed: {0}")]
    Quiz(String),

    #[error("Lecture generation failed: {0}")]
    Lecture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl SmartLearnError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SmartLearnError::InvalidInput(_)
                | SmartLearnError::SlideAudioMismatch { .. }
                | SmartLearnError::NotFound(_)
                | SmartLearnError::AlreadyExists(_)
        )
    }
}

impl From<lopdf::Error> for SmartLearnError {
    fn from(e: lopdf::Error) -> Self {
        SmartLearnError::Pdf(e.to_string())
    }
}

impl From<s3::error::S3Error> for SmartLearnError {
    fn from(e: s3::error::S3Error) -> Self {
        SmartLearnError::Storage(e.to_string())
    }
}

/// Result type alias for SmartLearn operations.
pub type Result<T> = std::result::Result<T, SmartLearnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(SmartLearnError::InvalidInput("x".into()).is_client_error());
        assert!(SmartLearnError::SlideAudioMismatch { slides: 2, clips: 1 }.is_client_error());
        assert!(!SmartLearnError::OpenAI("quota".into()).is_client_error());
        assert!(!SmartLearnError::Config("missing key".into()).is_client_error());
    }

    #[test]
    fn test_mismatch_message() {
        let err = SmartLearnError::SlideAudioMismatch { slides: 3, clips: 2 };
        assert_eq!(
            err.to_string(),
            "Slide/audio count mismatch: 3 slide images but 2 audio clips"
        );
    }
}
