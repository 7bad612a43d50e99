//! SmartLearn CLI entry point.

use anyhow::Result;
use clap::Parser;
use smartlearn::cli::{commands, Cli, Commands};
use smartlearn::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("smartlearn={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    match &cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host.clone(), *port, settings).await?;
        }

        Commands::Ingest { path, name } => {
            commands::run_ingest(path, name.as_deref(), settings).await?;
        }

        Commands::Ask { question } => {
            commands::run_ask(question, settings).await?;
        }

        Commands::Quiz { filenames, json } => {
            commands::run_quiz(filenames, *json, settings).await?;
        }

        Commands::Lecture { path } => {
            commands::run_lecture(path, settings).await?;
        }

        Commands::Delete { filename } => {
            commands::run_delete(filename, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path.as_ref())?;
        }
    }

    Ok(())
}
