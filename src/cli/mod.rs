//! CLI module for SmartLearn.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{content_preview, Output};

use clap::{Parser, Subcommand};

/// SmartLearn - lecture slides in, tutoring, quizzes and narrated videos out
///
/// Index PDFs for question answering, generate multiple-choice quizzes and
/// turn slide decks into narrated lecture videos.
#[derive(Parser, Debug)]
#[command(name = "smartlearn")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SMARTLEARN_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Index a PDF for question answering and quizzes
    Ingest {
        /// Path to the PDF
        path: String,

        /// Name to store the file under (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Ask the tutor a question about the indexed material
    Ask {
        /// The question to ask
        question: String,
    },

    /// Generate a multiple-choice quiz from indexed files
    Quiz {
        /// Indexed file names
        #[arg(required = true)]
        filenames: Vec<String>,

        /// Print the raw JSON records
        #[arg(long)]
        json: bool,
    },

    /// Generate a narrated lecture video from a slide deck
    Lecture {
        /// Path to the PDF
        path: String,
    },

    /// Delete an indexed PDF and its chunks
    Delete {
        /// Stored file name
        filename: String,
    },

    /// List indexed files and lecture videos
    List,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "retrieval.max_passages")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quiz_command() {
        let cli = Cli::parse_from(["smartlearn", "-vv", "quiz", "a.pdf", "b.pdf", "--json"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Quiz { filenames, json } => {
                assert_eq!(filenames, vec!["a.pdf", "b.pdf"]);
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_quiz_requires_filenames() {
        assert!(Cli::try_parse_from(["smartlearn", "quiz"]).is_err());
    }
}
