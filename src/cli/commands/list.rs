//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::vector_store::VectorStore;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let files = orchestrator.vector_store().list_filenames().await?;
    if files.is_empty() {
        Output::info("No files indexed yet. Use 'smartlearn ingest <pdf>' to add content.");
    } else {
        Output::header(&format!("Indexed Files ({})", files.len()));
        println!();
        for file in &files {
            Output::file_info(&file.filename, file.chunk_count, file.indexed_at);
        }

        let total_chunks: u32 = files.iter().map(|f| f.chunk_count).sum();
        println!();
        Output::kv("Total files", &files.len().to_string());
        Output::kv("Total chunks", &total_chunks.to_string());
    }

    let videos = orchestrator.lecture().list_videos().await?;
    if !videos.is_empty() {
        Output::header(&format!("Lecture Videos ({})", videos.len()));
        println!();
        for video in &videos {
            Output::list_item(video);
        }
    }

    Ok(())
}
