//! Verify command implementation.

use super::{open_log, CliResult};
use rvm_core::wal::LogEntry;
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of complete entries checked.
    pub entries_checked: usize,
    /// Number of redo records in those entries.
    pub records_checked: usize,
    /// Bytes of incomplete trailing entry.
    pub torn_bytes: u64,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    /// True if the store will open cleanly.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> CliResult<()> {
    println!("Verifying store at {}", path.display());
    println!();

    let result = check(path)?;
    println!("Log:");
    println!("  Entries checked: {}", result.entries_checked);
    println!("  Records checked: {}", result.records_checked);
    if result.torn_bytes > 0 {
        println!(
            "  Incomplete tail: {} bytes (discarded on next open)",
            result.torn_bytes
        );
    }
    for error in &result.errors {
        println!("  Error: {error}");
    }

    println!();
    if result.is_ok() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}

/// Walks every log entry, stopping at the first damaged one.
pub fn check(path: &Path) -> CliResult<VerifyResult> {
    let mut result = VerifyResult::default();
    let Some(log) = open_log(path)? else {
        return Ok(result);
    };

    let mut iter = log.iter()?;
    let mut failure = None;
    for item in iter.by_ref() {
        match item {
            Ok((_, LogEntry::Transaction { records, .. })) => {
                result.entries_checked += 1;
                result.records_checked += records.len();
            }
            Ok((_, LogEntry::Destroy { .. })) => result.entries_checked += 1,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    if let Some(e) = failure {
        result
            .errors
            .push(format!("entry at offset {}: {e}", iter.valid_end()));
    }
    if iter.is_torn() {
        result.torn_bytes = iter.total_size() - iter.valid_end();
    }
    Ok(result)
}
