//! Ingest command implementation.

use super::stored_name;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SmartLearnError;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::PathBuf;

/// Run the ingest command.
pub async fn run_ingest(path: &str, name: Option<&str>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = PathBuf::from(shellexpand::tilde(path).to_string());
    let filename = stored_name(&path, name)?;
    let pdf = tokio::fs::read(&path).await?;

    let orchestrator = Orchestrator::new(settings)?;
    orchestrator.ensure_buckets().await?;

    let spinner = Output::spinner(&format!("Indexing {}...", filename));
    let result = orchestrator.ingest(&pdf, &filename).await;
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            Output::success(&format!(
                "Indexed {} chunks from {}",
                outcome.chunks_indexed, outcome.filename
            ));
            Ok(())
        }
        Err(SmartLearnError::AlreadyExists(name)) => {
            Output::warning(&format!(
                "{} is already uploaded. Delete it first to re-index.",
                name
            ));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to ingest {}: {}", filename, e));
            Err(e.into())
        }
    }
}
