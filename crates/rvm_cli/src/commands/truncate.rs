//! Truncate command implementation.

use super::CliResult;
use rvm_core::{Config, FoldReport, Store};
use std::path::Path;

/// Runs the truncate command.
pub fn run(path: &Path) -> CliResult<()> {
    let report = fold(path)?;

    println!("Folded log into {}", path.display());
    println!("  Transactions:    {}", report.transactions);
    println!("  Records applied: {}", report.records_applied);
    println!("  Records skipped: {}", report.records_skipped);
    println!("  Segments zeroed: {}", report.segments_zeroed);
    println!("  Bytes written:   {}", report.bytes_written);
    for segment in &report.segments {
        println!("  Updated:         {segment}");
    }
    Ok(())
}

/// Opens an existing store and folds its log.
pub fn fold(path: &Path) -> CliResult<FoldReport> {
    let store = Store::open_with_config(path, Config::default().create_if_missing(false))?;
    Ok(store.truncate_log()?)
}
