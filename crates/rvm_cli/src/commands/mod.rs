//! CLI command implementations.

pub mod dump_log;
pub mod inspect;
pub mod truncate;
pub mod verify;

use clap::ValueEnum;
use rvm_core::wal::LogManager;
use rvm_core::LOG_FILE;
use rvm_storage::FileBackend;
use std::path::Path;

/// Result type shared by the commands.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// How a command prints its report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Opens the log of the store at `path` for reading, if there is one.
///
/// This does not take the store lock and never modifies the log.
pub(crate) fn open_log(path: &Path) -> CliResult<Option<LogManager>> {
    if !path.is_dir() {
        return Err(format!("No store found at {}", path.display()).into());
    }
    let log_path = path.join(LOG_FILE);
    if !log_path.exists() {
        return Ok(None);
    }
    let backend = FileBackend::open_existing(&log_path)?;
    Ok(Some(LogManager::new(Box::new(backend), false)))
}
