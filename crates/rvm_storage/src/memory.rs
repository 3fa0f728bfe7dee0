//! Backend over a shared byte vector.

use crate::backend::{check_read, StorageBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// A backend that keeps its bytes in memory.
///
/// Clones share one buffer. Tests keep a clone next to the one handed to
/// the log so they can cut or corrupt its bytes to simulate a crash.
///
/// ```rust
/// use rvm_storage::{InMemoryBackend, StorageBackend};
///
/// let mut log = InMemoryBackend::new();
/// let observer = log.clone();
/// log.append(b"entry")?;
/// assert_eq!(observer.data(), b"entry");
/// # Ok::<(), rvm_storage::StorageError>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    bytes: Arc<RwLock<Vec<u8>>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `data`.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(RwLock::new(data)),
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }

    /// Replaces the stored bytes.
    pub fn set_data(&self, data: Vec<u8>) {
        *self.bytes.write() = data;
    }
}

fn to_index(value: u64) -> StorageResult<usize> {
    usize::try_from(value).map_err(|_| StorageError::TooLarge { size: value })
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let bytes = self.bytes.read();
        check_read(offset, len, bytes.len() as u64)?;
        let start = to_index(offset)?;
        Ok(bytes[start..start + len].to_vec())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let start = to_index(offset)?;
        let end = start + data.len();
        let mut bytes = self.bytes.write();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> StorageResult<()> {
        let len = to_index(len)?;
        self.bytes.write().resize(len, 0);
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.bytes.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }
}
