//! Streaming log entry iterator.
//!
//! Reads entries one frame at a time, so memory use is bounded by the
//! largest single entry rather than the whole log.

use crate::error::{CoreError, CoreResult};
use crate::wal::record::{
    compute_crc32, EntryHeader, LogEntry, HEADER_SIZE, LOG_BEGIN_MAGIC, LOG_END_MAGIC,
    TRAILER_SIZE,
};
use parking_lot::MutexGuard;
use rvm_storage::StorageBackend;

/// Read size used when checking whether a damaged tail is all zeros.
pub(crate) const ZERO_SCAN_CHUNK: u64 = 64 * 1024;

/// A streaming iterator over log entries.
///
/// Yields `(offset, entry)` pairs for every complete entry.
///
/// # Error Handling
///
/// - An incomplete header or body at the end of the log ends iteration
/// - A checksum or end-marker failure in the entry that reaches end of log
///   ends iteration
/// - A zero-filled tail ends iteration
///
/// All three mark the iterator as torn; [`LogIterator::valid_end`] is then
/// the offset just past the last complete entry. Any other failure is
/// reported as corruption.
pub struct LogIterator<'a> {
    backend: MutexGuard<'a, Box<dyn StorageBackend>>,
    total_size: u64,
    offset: u64,
    torn: bool,
    finished: bool,
}

impl<'a> LogIterator<'a> {
    /// Creates an iterator starting at the beginning of the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size cannot be determined.
    pub fn new(backend: MutexGuard<'a, Box<dyn StorageBackend>>) -> CoreResult<Self> {
        let total_size = backend.size()?;
        Ok(Self {
            backend,
            total_size,
            offset: 0,
            torn: false,
            finished: false,
        })
    }

    /// Offset just past the last complete entry read so far.
    #[must_use]
    pub fn valid_end(&self) -> u64 {
        self.offset
    }

    /// Total size of the log when iteration started.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// True if iteration stopped at an incomplete trailing entry.
    #[must_use]
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    fn stop_torn(&mut self) -> CoreResult<Option<(u64, LogEntry)>> {
        self.torn = true;
        self.finished = true;
        Ok(None)
    }

    fn tail_is_zero(&self) -> CoreResult<bool> {
        let mut at = self.offset;
        while at < self.total_size {
            let len = (self.total_size - at).min(ZERO_SCAN_CHUNK);
            let chunk = self.backend.read_at(at, len as usize)?;
            if chunk.iter().any(|&b| b != 0) {
                return Ok(false);
            }
            at += len;
        }
        Ok(true)
    }

    fn read_next(&mut self) -> CoreResult<Option<(u64, LogEntry)>> {
        if self.finished {
            return Ok(None);
        }

        let start = self.offset;
        let remaining = self.total_size - start;
        if remaining == 0 {
            self.finished = true;
            return Ok(None);
        }
        if remaining < HEADER_SIZE as u64 {
            return self.stop_torn();
        }

        let header_bytes = self.backend.read_at(start, HEADER_SIZE)?;
        if header_bytes[0..4] != LOG_BEGIN_MAGIC && self.tail_is_zero()? {
            return self.stop_torn();
        }
        let header = EntryHeader::parse(&header_bytes, start)?;

        let frame_len = header.frame_len();
        if frame_len > remaining {
            return self.stop_torn();
        }
        let at_end = frame_len == remaining;

        let frame_len = usize::try_from(frame_len)
            .map_err(|_| CoreError::log_corruption("entry larger than address space"))?;
        let frame = self.backend.read_at(start, frame_len)?;
        let crc_at = frame_len - TRAILER_SIZE;

        let stored = u32::from_le_bytes([
            frame[crc_at],
            frame[crc_at + 1],
            frame[crc_at + 2],
            frame[crc_at + 3],
        ]);
        let computed = compute_crc32(&frame[..crc_at]);
        if stored != computed {
            if at_end {
                return self.stop_torn();
            }
            self.finished = true;
            return Err(CoreError::ChecksumMismatch {
                expected: stored,
                actual: computed,
            });
        }

        if frame[crc_at + 4..] != LOG_END_MAGIC {
            if at_end {
                return self.stop_torn();
            }
            self.finished = true;
            return Err(CoreError::log_corruption(format!(
                "missing end marker for entry at offset {start}"
            )));
        }

        let entry = LogEntry::decode_body(&header, &frame[HEADER_SIZE..crc_at])?;
        self.offset = start + frame_len as u64;
        Ok(Some((start, entry)))
    }
}

impl Iterator for LogIterator<'_> {
    type Item = CoreResult<(u64, LogEntry)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
