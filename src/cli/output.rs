//! CLI output formatting utilities.

use crate::quiz::QuizItem;
use chrono::{DateTime, Local, Utc};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print an indexed file.
    pub fn file_info(filename: &str, chunks: u32, indexed_at: DateTime<Utc>) {
        println!(
            "  {} {} ({} chunks, indexed {})",
            style("*").cyan(),
            style(filename).bold(),
            chunks,
            style(indexed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")).dim()
        );
    }

    /// Print a numbered quiz question with its options.
    pub fn quiz_item(number: usize, item: &QuizItem) {
        println!("\n{} {}", style(format!("{}.", number)).cyan().bold(), item.question);
        for (letter, option) in ('A'..='D').zip(&item.options) {
            if *option == item.correct_answer {
                println!("   {} {}", style(format!("{})", letter)).green(), style(option).green());
            } else {
                println!("   {}) {}", letter, option);
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis, on a character boundary.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
