//! CLI command implementations.

mod ask;
mod config;
mod delete;
mod ingest;
mod lecture;
mod list;
mod quiz;
mod serve;

pub use ask::run_ask;
pub use config::{run_config, set_config_value};
pub use delete::run_delete;
pub use ingest::run_ingest;
pub use lecture::run_lecture;
pub use list::run_list;
pub use quiz::run_quiz;
pub use serve::{router, run_serve, AppState};

use std::path::Path;

/// File name component of a path, used as the stored object name.
pub(crate) fn stored_name(path: &Path, name: Option<&str>) -> anyhow::Result<String> {
    match name {
        Some(n) => Ok(n.to_string()),
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Cannot determine a file name from {}", path.display())),
    }
}
