//! Delete command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the delete command.
pub async fn run_delete(filename: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::Manage)?;
    let orchestrator = Orchestrator::new(settings)?;

    match orchestrator.ingestor().delete(filename).await {
        Ok(removed) => {
            Output::success(&format!(
                "Deleted {} ({} chunks)",
                removed.filename, removed.chunks_deleted
            ));
            if !removed.object_deleted {
                Output::warning("The stored PDF was already gone; only chunks were removed.");
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to delete {}: {}", filename, e));
            Err(e.into())
        }
    }
}
