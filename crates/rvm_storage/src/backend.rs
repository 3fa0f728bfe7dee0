//! The byte-store trait.

use crate::error::{StorageError, StorageResult};

/// A flat, growable run of bytes.
///
/// The engine uses one backend for the write-ahead log, where it only
/// appends and truncates, and one per segment file while folding, where it
/// writes at arbitrary offsets. Backends know nothing of either format.
///
/// Implementors supply positional reads and writes, `set_len`, `size` and
/// `sync`. Appending, growing, shrinking and whole-store reads are built on
/// those.
pub trait StorageBackend: Send + Sync {
    /// Reads exactly `len` bytes at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`] if the range passes the end.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Writes `data` at `offset`. Writing past the end grows the store and
    /// the gap reads back as zeros.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Sets the stored length, zero-filling or cutting as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the resize fails.
    fn set_len(&mut self, len: u64) -> StorageResult<()>;

    /// Returns the number of bytes stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Hands buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    /// Makes written bytes and the current length survive a crash.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Writes `data` at the end and returns the offset it landed at.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.size()?;
        self.write_at(offset, data)?;
        Ok(offset)
    }

    /// Grows the store to at least `len` bytes. Never shrinks.
    ///
    /// # Errors
    ///
    /// Returns an error if the resize fails.
    fn extend_to(&mut self, len: u64) -> StorageResult<()> {
        if self.size()? < len {
            self.set_len(len)?;
        }
        Ok(())
    }

    /// Cuts the store back to `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidResize`] if `len` is past the end.
    fn truncate(&mut self, len: u64) -> StorageResult<()> {
        let current = self.size()?;
        if len > current {
            return Err(StorageError::InvalidResize {
                current,
                requested: len,
            });
        }
        self.set_len(len)
    }

    /// Reads every stored byte.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TooLarge`] if the store does not fit in
    /// memory, or any read error.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = usize::try_from(size).map_err(|_| StorageError::TooLarge { size })?;
        self.read_at(0, len)
    }
}

/// Fails unless `[offset, offset + len)` lies within `size` bytes.
pub(crate) fn check_read(offset: u64, len: usize, size: u64) -> StorageResult<()> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(StorageError::ReadPastEnd { offset, len, size }),
    }
}
