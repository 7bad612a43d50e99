//! Lecture command implementation.

use super::stored_name;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Run the lecture command in the foreground.
pub async fn run_lecture(path: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Lecture) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = PathBuf::from(shellexpand::tilde(path).to_string());
    let filename = stored_name(&path, None)?;
    let pdf = tokio::fs::read(&path).await?;

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.ensure_buckets().await?;

    let spinner = Output::spinner("Generating script, narration and video...");
    let result = orchestrator.generate_lecture(&pdf, &filename).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Lecture generation failed: {}", e));
            return Err(e.into());
        }
    };

    Output::success(&report.message);
    Output::kv("Folder", &report.folder);
    Output::kv("Video", &report.video_file);
    Output::kv("Script", &report.script_file);
    Output::kv("Metadata", &report.metadata_file);
    Output::kv("Audio clips", &report.audio_files.len().to_string());
    Output::kv("Slide images", &report.slide_images.len().to_string());

    Ok(())
}
