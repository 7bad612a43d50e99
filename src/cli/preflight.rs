//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::error::{Result, SmartLearnError};
use crate::openai::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion calls the chat and embedding APIs.
    Ingest,
    /// Answers and quizzes need the API key.
    Ask,
    /// Lectures also shell out to the media tools.
    Lecture,
    /// Serving exposes every pipeline.
    Serve,
    /// Listing and deleting touch only local stores.
    Manage,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Ingest | Operation::Ask => {
            check_api_key()?;
        }
        Operation::Lecture | Operation::Serve => {
            check_api_key()?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
            check_tool("pdftoppm")?;
        }
        Operation::Manage => {}
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(SmartLearnError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), pdftoppm prints to stderr with -v
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        "pdftoppm" => "-v",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SmartLearnError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SmartLearnError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SmartLearnError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manage_has_no_requirements() {
        assert!(check(Operation::Manage).is_ok());
    }

    #[test]
    fn test_missing_tool_reported() {
        let result = check_tool("smartlearn-no-such-tool");
        assert!(matches!(result, Err(SmartLearnError::ToolNotFound(_))));
    }
}
