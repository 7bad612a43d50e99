//! Quiz command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::quiz::QuizRecord;
use anyhow::Result;

/// Run the quiz command.
pub async fn run_quiz(filenames: &[String], json: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Writing questions...");
    let records = orchestrator.quiz().generate(filenames).await;
    spinner.finish_and_clear();
    let records = records?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        Output::info("No questions generated. Are the files indexed? Try 'smartlearn list'.");
        return Ok(());
    }

    Output::header(&format!("Quiz ({} records)", records.len()));
    let mut number = 0;
    for record in &records {
        match record {
            QuizRecord::Item(item) => {
                number += 1;
                Output::quiz_item(number, item);
            }
            QuizRecord::Error { error } => Output::warning(&format!("Skipped a section: {}", error)),
        }
    }
    println!();

    Ok(())
}
