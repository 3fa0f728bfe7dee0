//! Inspect command implementation.

use super::{open_log, CliResult, OutputFormat};
use rvm_core::{LogScan, RecoveryCoordinator, StoreDir};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Log file size in bytes.
    pub log_size: u64,
    /// Committed transactions waiting to be folded.
    pub pending_transactions: usize,
    /// Destroy entries waiting to be folded.
    pub pending_destroys: usize,
    /// Redo records waiting to be folded.
    pub pending_records: usize,
    /// Bytes of incomplete trailing entry, discarded on next open.
    pub torn_bytes: u64,
    /// Segments with a backing file or pending redo records.
    pub segments: Vec<SegmentInfo>,
}

/// Statistics for a single segment.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Segment name.
    pub name: String,
    /// Backing file size, if the file exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Redo records for this segment not yet folded.
    pub pending_records: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: OutputFormat) -> CliResult<()> {
    let result = collect(path)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text(&result),
    }
    Ok(())
}

/// Gathers segment and log statistics without opening the store.
pub fn collect(path: &Path) -> CliResult<InspectResult> {
    let (log_size, scan) = match open_log(path)? {
        Some(log) => (log.size()?, RecoveryCoordinator::scan(&log)?),
        None => (0, LogScan::default()),
    };

    let mut files = BTreeMap::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !StoreDir::is_reserved(name) {
                files.insert(name.to_string(), meta.len());
            }
        }
    }

    let mut names: Vec<&String> = files.keys().chain(scan.pending.keys()).collect();
    names.sort();
    names.dedup();

    let segments = names
        .into_iter()
        .map(|name| SegmentInfo {
            name: name.clone(),
            file_size: files.get(name).copied(),
            pending_records: scan.pending.get(name).copied().unwrap_or(0),
        })
        .collect();

    Ok(InspectResult {
        path: path.display().to_string(),
        log_size,
        pending_transactions: scan.transactions,
        pending_destroys: scan.destroys,
        pending_records: scan.records,
        torn_bytes: scan.torn_bytes,
        segments,
    })
}

fn print_text(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!();
    println!("Log:");
    println!("  Size:                 {} bytes", result.log_size);
    println!("  Pending transactions: {}", result.pending_transactions);
    println!("  Pending destroys:     {}", result.pending_destroys);
    println!("  Pending records:      {}", result.pending_records);
    if result.torn_bytes > 0 {
        println!("  Torn tail:            {} bytes", result.torn_bytes);
    }
    println!();
    println!("Segments ({}):", result.segments.len());
    for seg in &result.segments {
        let size = seg
            .file_size
            .map_or_else(|| "no file".to_string(), |s| format!("{s} bytes"));
        println!(
            "  {:<32} {:>16}  {} pending",
            seg.name, size, seg.pending_records
        );
    }
}
