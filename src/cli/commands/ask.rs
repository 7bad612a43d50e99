//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use futures::StreamExt;
use std::io::Write;

/// Run the ask command, printing the answer as it streams.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let mut answer = orchestrator.answer().answer(question);

    println!();
    let mut stdout = std::io::stdout();
    while let Some(piece) = answer.next().await {
        print!("{}", piece);
        stdout.flush()?;
    }
    println!("\n");

    Ok(())
}
