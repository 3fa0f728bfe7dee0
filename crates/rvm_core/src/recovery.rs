//! Recovery coordinator.
//!
//! Three jobs, all driven by the write-ahead log:
//!
//! 1. **Scan** at store open: find the end of the last complete entry,
//!    count what is pending per segment, and resume transaction IDs
//! 2. **Replay** at segment map: apply pending redo records for one segment
//!    onto its freshly loaded buffer, leaving the file untouched
//! 3. **Fold** at `truncate_log`: write every pending record into the
//!    segment files, fsync them, then clear the log
//!
//! A `Destroy` entry voids every earlier record for its segment, so redo
//! committed before a destroy never reaches a later segment of the same name.

use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::segment::validate_segment_name;
use crate::types::TransactionId;
use crate::wal::{LogEntry, LogManager, RedoRecord};
use rvm_storage::{FileBackend, StorageBackend};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use tracing::{debug, info};

/// Result of scanning the log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogScan {
    /// Offset just past the last complete entry.
    pub valid_end: u64,
    /// Bytes of incomplete trailing entry after `valid_end`.
    pub torn_bytes: u64,
    /// Number of transaction entries.
    pub transactions: usize,
    /// Number of destroy entries.
    pub destroys: usize,
    /// Number of redo records across all transaction entries.
    pub records: usize,
    /// Highest transaction ID in the log.
    pub max_txid: Option<TransactionId>,
    /// Redo records still to be folded, per segment name.
    pub pending: BTreeMap<String, usize>,
}

/// Result of folding the log into segment files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldReport {
    /// Transaction entries read from the log.
    pub transactions: usize,
    /// Redo records written to segment files.
    pub records_applied: usize,
    /// Redo records skipped because their segment was destroyed later.
    pub records_skipped: usize,
    /// Destroyed segments whose surviving file was zeroed.
    pub segments_zeroed: usize,
    /// Payload bytes written.
    pub bytes_written: u64,
    /// Names of the segment files that were written, sorted.
    pub segments: Vec<String>,
}

/// Drives log scan, replay and fold.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryCoordinator;

impl RecoveryCoordinator {
    /// Scans every complete entry in the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log is corrupted before its final entry.
    pub fn scan(log: &LogManager) -> CoreResult<LogScan> {
        let mut scan = LogScan::default();
        let mut iter = log.iter()?;

        for item in iter.by_ref() {
            let (_, entry) = item?;
            match entry {
                LogEntry::Transaction { txid, records } => {
                    scan.transactions += 1;
                    scan.records += records.len();
                    scan.max_txid = scan.max_txid.max(Some(txid));
                    for record in records {
                        *scan.pending.entry(record.segment).or_default() += 1;
                    }
                }
                LogEntry::Destroy { segment } => {
                    scan.destroys += 1;
                    scan.pending.remove(&segment);
                }
            }
        }

        scan.valid_end = iter.valid_end();
        scan.torn_bytes = iter.total_size() - iter.valid_end();
        Ok(scan)
    }

    /// Applies pending redo records for `name` onto `buffer`.
    ///
    /// If the log holds a destroy entry for `name`, the buffer is zeroed and
    /// only records committed after the last such entry are applied. A file
    /// that outlived its destroy because of a crash therefore reads as a
    /// fresh segment. The buffer grows with zero bytes if a record reaches
    /// past its end. Returns the number of records applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn replay_segment(log: &LogManager, name: &str, buffer: &mut Vec<u8>) -> CoreResult<usize> {
        let mut pending: Vec<RedoRecord> = Vec::new();
        let mut destroyed = false;
        for item in log.iter()? {
            let (_, entry) = item?;
            match entry {
                LogEntry::Transaction { records, .. } => {
                    pending.extend(records.into_iter().filter(|r| r.segment == name));
                }
                LogEntry::Destroy { segment } if segment == name => {
                    destroyed = true;
                    pending.clear();
                }
                LogEntry::Destroy { .. } => {}
            }
        }

        if destroyed {
            buffer.fill(0);
        }
        for record in &pending {
            let start = to_index(record.offset)?;
            let end = to_index(record.end())?;
            if end > buffer.len() {
                buffer.resize(end, 0);
            }
            buffer[start..end].copy_from_slice(&record.data);
        }

        if !pending.is_empty() {
            debug!(segment = name, records = pending.len(), "replayed pending redo");
        }
        Ok(pending.len())
    }

    /// Writes every pending record into its segment file, then clears the log.
    ///
    /// A segment file named by a destroy entry is zeroed first, keeping its
    /// length, so the old contents of a file whose removal was cut short by
    /// a crash never resurface. Segment files are created if missing and
    /// grown if a record reaches past their end. All written files are fsynced before the log is
    /// cleared, so a crash part way through leaves the log intact and the
    /// fold is simply repeated.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or a segment file cannot
    /// be written. The log is left untouched in that case.
    pub fn fold(log: &LogManager, dir: &StoreDir) -> CoreResult<FoldReport> {
        let entries = log.read_all()?;

        let mut last_destroy: HashMap<&str, usize> = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            if let LogEntry::Destroy { segment } = entry {
                last_destroy.insert(segment.as_str(), index);
            }
        }

        let mut report = FoldReport::default();
        let mut files: BTreeMap<&str, FileBackend> = BTreeMap::new();

        let mut destroyed: Vec<&str> = last_destroy.keys().copied().collect();
        destroyed.sort_unstable();
        for name in destroyed {
            let path = dir.segment_path(name);
            if !fs::symlink_metadata(&path).is_ok_and(|meta| meta.is_file()) {
                continue;
            }
            let file = segment_file(&mut files, dir, name)?;
            let len = file.size()?;
            file.truncate(0)?;
            file.extend_to(len)?;
            report.segments_zeroed += 1;
        }

        for (index, entry) in entries.iter().enumerate() {
            let LogEntry::Transaction { records, .. } = entry else {
                continue;
            };
            report.transactions += 1;

            for record in records {
                let name = record.segment.as_str();
                if last_destroy.get(name).is_some_and(|&d| d > index) {
                    report.records_skipped += 1;
                    continue;
                }

                let file = segment_file(&mut files, dir, name)?;
                file.write_at(record.offset, &record.data)?;
                report.records_applied += 1;
                report.bytes_written += record.data.len() as u64;
            }
        }

        for file in files.values_mut() {
            file.sync()?;
        }
        report.segments = files.keys().map(|name| (*name).to_string()).collect();

        log.clear()?;
        info!(
            transactions = report.transactions,
            records = report.records_applied,
            segments = report.segments.len(),
            "folded log into segment files"
        );
        Ok(report)
    }
}

/// Returns the open backend for `name`, opening it on first use.
fn segment_file<'a, 'n>(
    files: &'a mut BTreeMap<&'n str, FileBackend>,
    dir: &StoreDir,
    name: &'n str,
) -> CoreResult<&'a mut FileBackend> {
    match files.entry(name) {
        Entry::Occupied(e) => Ok(e.into_mut()),
        Entry::Vacant(e) => {
            validate_segment_name(name, usize::from(u16::MAX)).map_err(|_| {
                CoreError::log_corruption(format!("invalid segment name in log: {name:?}"))
            })?;
            Ok(e.insert(FileBackend::open(&dir.segment_path(name))?))
        }
    }
}

fn to_index(offset: u64) -> CoreResult<usize> {
    usize::try_from(offset)
        .map_err(|_| CoreError::log_corruption("redo record offset exceeds address space"))
}
