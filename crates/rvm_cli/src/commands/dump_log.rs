//! Dump-log command implementation.

use super::{open_log, CliResult, OutputFormat};
use rvm_core::wal::LogEntry;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// Decoded log entry for display.
#[derive(Debug, Serialize)]
pub struct LogEntryInfo {
    /// Offset of the entry in the log.
    pub offset: u64,
    /// Entry type (transaction, destroy).
    pub entry_type: String,
    /// Transaction ID, for transaction entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<u64>,
    /// Segment name, for destroy entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    /// Redo records, for transaction entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RedoInfo>,
}

/// Decoded redo record for display.
#[derive(Debug, Serialize)]
pub struct RedoInfo {
    /// Segment name.
    pub segment: String,
    /// Byte offset within the segment.
    pub offset: u64,
    /// Number of bytes.
    pub length: usize,
    /// Bytes as lowercase hex, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
}

/// Runs the dump-log command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    with_bytes: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let entries = collect(path, limit, with_bytes)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => print_text(&entries),
    }
    Ok(())
}

/// Decodes up to `limit` complete log entries.
pub fn collect(
    path: &Path,
    limit: Option<usize>,
    with_bytes: bool,
) -> CliResult<Vec<LogEntryInfo>> {
    let Some(log) = open_log(path)? else {
        return Ok(Vec::new());
    };

    let mut entries = Vec::new();
    for item in log.iter()?.take(limit.unwrap_or(usize::MAX)) {
        let (offset, entry) = item?;
        entries.push(describe(offset, entry, with_bytes));
    }
    Ok(entries)
}

fn describe(offset: u64, entry: LogEntry, with_bytes: bool) -> LogEntryInfo {
    match entry {
        LogEntry::Transaction { txid, records } => LogEntryInfo {
            offset,
            entry_type: "transaction".to_string(),
            txid: Some(txid.as_u64()),
            segment: None,
            records: records
                .into_iter()
                .map(|r| RedoInfo {
                    length: r.data.len(),
                    hex: with_bytes.then(|| to_hex(&r.data)),
                    segment: r.segment,
                    offset: r.offset,
                })
                .collect(),
        },
        LogEntry::Destroy { segment } => LogEntryInfo {
            offset,
            entry_type: "destroy".to_string(),
            txid: None,
            segment: Some(segment),
            records: Vec::new(),
        },
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn print_text(entries: &[LogEntryInfo]) {
    println!("Log entries ({}):", entries.len());
    println!();
    for entry in entries {
        match (&entry.txid, &entry.segment) {
            (Some(txid), _) => println!(
                "@{:<10} transaction txid={} records={}",
                entry.offset,
                txid,
                entry.records.len()
            ),
            (None, Some(segment)) => println!("@{:<10} destroy segment={}", entry.offset, segment),
            (None, None) => println!("@{:<10} {}", entry.offset, entry.entry_type),
        }
        for record in &entry.records {
            print!(
                "             {} [{}..{})",
                record.segment,
                record.offset,
                record.offset + record.length as u64
            );
            match &record.hex {
                Some(hex) => println!(" {hex}"),
                None => println!(),
            }
        }
    }
}
