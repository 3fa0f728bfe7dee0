//! Log writer and reader.

use crate::error::CoreResult;
use crate::wal::iterator::LogIterator;
use crate::wal::record::LogEntry;
use parking_lot::Mutex;
use rvm_storage::StorageBackend;
use tracing::warn;

/// Manages log appends and reads.
///
/// Each call to [`LogManager::append`] writes one whole entry and, with
/// `sync_on_commit`, fsyncs it before returning. That fsync is the
/// durability point of a commit.
pub struct LogManager {
    backend: Mutex<Box<dyn StorageBackend>>,
    sync_on_commit: bool,
}

impl LogManager {
    /// Creates a new log manager.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend: Mutex::new(backend),
            sync_on_commit,
        }
    }

    /// Appends an entry to the log.
    ///
    /// Returns the offset where the entry was written. If the write fails,
    /// the log is cut back to its previous length.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be encoded or written.
    pub fn append(&self, entry: &LogEntry) -> CoreResult<u64> {
        let data = entry.encode()?;

        let mut backend = self.backend.lock();
        let start = backend.size()?;
        let written = backend.append(&data).and_then(|offset| {
            if self.sync_on_commit {
                backend.sync()?;
            } else {
                backend.flush()?;
            }
            Ok(offset)
        });

        match written {
            Ok(offset) => Ok(offset),
            Err(e) => {
                if let Err(cleanup) = backend.truncate(start) {
                    warn!(error = %cleanup, "failed to discard partial log entry");
                }
                Err(e.into())
            }
        }
    }

    /// Flushes and fsyncs the log.
    pub fn sync(&self) -> CoreResult<()> {
        self.backend.lock().sync()?;
        Ok(())
    }

    /// Returns the current log size.
    pub fn size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    /// Returns true if the log holds no bytes.
    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.size()? == 0)
    }

    /// Returns a streaming iterator over log entries.
    ///
    /// The iterator holds the log lock until dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be accessed.
    pub fn iter(&self) -> CoreResult<LogIterator<'_>> {
        LogIterator::new(self.backend.lock())
    }

    /// Reads all complete entries from the log.
    pub fn read_all(&self) -> CoreResult<Vec<LogEntry>> {
        self.iter()?
            .map(|item| item.map(|(_, entry)| entry))
            .collect()
    }

    /// Truncates the log to the specified offset and fsyncs the new length.
    pub fn truncate(&self, offset: u64) -> CoreResult<()> {
        let mut backend = self.backend.lock();
        backend.truncate(offset)?;
        backend.sync()?;
        Ok(())
    }

    /// Clears all data from the log.
    ///
    /// Used after every entry has been folded into the segment files.
    pub fn clear(&self) -> CoreResult<()> {
        self.truncate(0)
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::TransactionId;
    use crate::wal::iterator::ZERO_SCAN_CHUNK;
    use crate::wal::RedoRecord;
    use rvm_storage::InMemoryBackend;

    fn create_log() -> (LogManager, InMemoryBackend) {
        let backend = InMemoryBackend::new();
        let log = LogManager::new(Box::new(backend.clone()), false);
        (log, backend)
    }

    fn txn(id: u64, segment: &str, offset: u64, data: &[u8]) -> LogEntry {
        LogEntry::Transaction {
            txid: TransactionId::new(id),
            records: vec![RedoRecord {
                segment: segment.into(),
                offset,
                data: data.to_vec(),
            }],
        }
    }

    #[test]
    fn append_and_read_back() {
        let (log, _) = create_log();
        let e1 = txn(1, "a", 0, b"one");
        let e2 = LogEntry::Destroy {
            segment: "b".into(),
        };

        assert_eq!(log.append(&e1).unwrap(), 0);
        let second = log.append(&e2).unwrap();
        assert!(second > 0);

        assert_eq!(log.read_all().unwrap(), vec![e1, e2]);
    }

    #[test]
    fn empty_log() {
        let (log, _) = create_log();
        assert!(log.is_empty().unwrap());
        assert!(log.read_all().unwrap().is_empty());

        let iter = log.iter().unwrap();
        assert!(!iter.is_torn());
    }

    #[test]
    fn offsets_are_reported() {
        let (log, _) = create_log();
        let a = log.append(&txn(1, "a", 0, b"x")).unwrap();
        let b = log.append(&txn(2, "a", 1, b"y")).unwrap();

        let offsets: Vec<u64> = log.iter().unwrap().map(|r| r.unwrap().0).collect();
        assert_eq!(offsets, vec![a, b]);
    }

    #[test]
    fn truncated_tail_is_torn() {
        let (log, raw) = create_log();
        log.append(&txn(1, "a", 0, b"complete")).unwrap();
        let good_end = log.size().unwrap();
        log.append(&txn(2, "a", 0, b"interrupted")).unwrap();

        let mut data = raw.data();
        data.truncate(data.len() - 5);
        raw.set_data(data);

        let mut iter = log.iter().unwrap();
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert!(iter.is_torn());
        assert_eq!(iter.valid_end(), good_end);
    }

    #[test]
    fn short_header_is_torn() {
        let (log, raw) = create_log();
        log.append(&txn(1, "a", 0, b"x")).unwrap();
        let mut data = raw.data();
        data.extend_from_slice(b"RVMB\x01");
        raw.set_data(data);

        let entries: Vec<_> = log.iter().unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_ok());
    }

    #[test]
    fn zero_filled_tail_is_torn() {
        let (log, raw) = create_log();
        log.append(&txn(1, "a", 0, b"x")).unwrap();
        let good_end = log.size().unwrap();
        let mut data = raw.data();
        data.extend_from_slice(&[0u8; 64]);
        raw.set_data(data);

        let mut iter = log.iter().unwrap();
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert!(iter.is_torn());
        assert_eq!(iter.valid_end(), good_end);
    }

    #[test]
    fn long_tails_are_scanned_in_chunks() {
        let (log, raw) = create_log();
        log.append(&txn(1, "a", 0, b"x")).unwrap();
        let good_end = log.size().unwrap();
        let tail = 3 * ZERO_SCAN_CHUNK as usize + 17;

        let mut data = raw.data();
        data.resize(data.len() + tail, 0);
        raw.set_data(data.clone());
        let mut iter = log.iter().unwrap();
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert!(iter.is_torn());
        assert_eq!(iter.valid_end(), good_end);
        drop(iter);

        // One stray byte in the last partial chunk makes it garbage.
        let last = data.len() - 1;
        data[last] = 1;
        raw.set_data(data);
        assert!(log.read_all().unwrap_err().is_corruption());
    }

    #[test]
    fn bad_checksum_in_last_entry_is_torn() {
        let (log, raw) = create_log();
        log.append(&txn(1, "a", 0, b"x")).unwrap();
        log.append(&txn(2, "a", 0, b"y")).unwrap();

        let mut data = raw.data();
        let crc_at = data.len() - 8;
        data[crc_at] ^= 0xFF;
        raw.set_data(data);

        let entries: Vec<_> = log.iter().unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn bad_checksum_mid_log_is_fatal() {
        let (log, raw) = create_log();
        log.append(&txn(1, "a", 0, b"x")).unwrap();
        let second = log.append(&txn(2, "a", 0, b"y")).unwrap();

        let mut data = raw.data();
        let crc_at = second as usize - 8;
        data[crc_at] ^= 0xFF;
        raw.set_data(data);

        let result = log.read_all();
        assert!(matches!(result, Err(CoreError::ChecksumMismatch { .. })));
    }

    #[test]
    fn garbage_mid_log_is_fatal() {
        let (log, raw) = create_log();
        log.append(&txn(1, "a", 0, b"x")).unwrap();
        let mut data = raw.data();
        data[0] = b'Z';
        raw.set_data(data);

        let err = log.read_all().unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn clear_and_truncate() {
        let (log, _) = create_log();
        log.append(&txn(1, "a", 0, b"x")).unwrap();
        let end = log.size().unwrap();
        log.append(&txn(2, "a", 0, b"y")).unwrap();

        log.truncate(end).unwrap();
        assert_eq!(log.read_all().unwrap().len(), 1);

        log.clear().unwrap();
        assert!(log.is_empty().unwrap());
    }
}
