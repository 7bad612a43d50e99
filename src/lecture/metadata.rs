//! Lecture metadata persisted alongside the generated artifacts.

use crate::pdf::Table;
use serde::{Deserialize, Serialize};

/// An embedded image saved to the slides bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideImage {
    /// Key in the slides bucket.
    pub object_name: String,
    pub format: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One PDF page of the deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideMetadata {
    /// 1-based slide number.
    pub number: u32,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub images: Vec<SlideImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Key of the narration clip in the audio bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_object: Option<String>,
}

impl SlideMetadata {
    /// Image descriptions, one per line, or "None".
    pub fn image_summary(&self) -> String {
        let described: Vec<&str> = self
            .images
            .iter()
            .filter_map(|i| i.description.as_deref())
            .filter(|d| !d.is_empty())
            .collect();
        if described.is_empty() {
            "None".to_string()
        } else {
            described.join("\n")
        }
    }

    /// Tables as markdown, or "None".
    pub fn table_summary(&self) -> String {
        if self.tables.is_empty() {
            "None".to_string()
        } else {
            self.tables
                .iter()
                .map(|t| t.to_markdown())
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

/// Everything known about one lecture run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LectureMetadata {
    /// Uploaded PDF name.
    pub filename: String,
    /// Prefix shared by every artifact of this run.
    pub folder: String,
    pub total_slides: usize,
    pub slides: Vec<SlideMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default)]
    pub audio_objects: Vec<String>,
}

impl LectureMetadata {
    pub fn new(filename: &str, folder: &str, slides: Vec<SlideMetadata>) -> Self {
        Self {
            filename: filename.to_string(),
            folder: folder.to_string(),
            total_slides: slides.len(),
            slides,
            script: None,
            audio_objects: Vec::new(),
        }
    }
}

/// Artifact prefix for a run: the PDF stem plus a timestamp.
pub fn folder_name(filename: &str, stamp: &str) -> String {
    let stem = filename
        .strip_suffix(".pdf")
        .or_else(|| filename.strip_suffix(".PDF"))
        .unwrap_or(filename);
    let stem: String = stem
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}_{}", stem, stamp)
}
