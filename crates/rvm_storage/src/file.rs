//! Backend over an operating-system file.

use crate::backend::{check_read, StorageBackend};
use crate::error::StorageResult;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A backend that keeps its bytes in one file.
///
/// The length is cached so appends never stat the file. Reads take `&self`
/// and share the cursor through a mutex; writes take `&mut self` and reach
/// the file directly.
///
/// ```no_run
/// use rvm_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut segment = FileBackend::open(Path::new("accounts"))?;
/// segment.extend_to(4096)?;
/// segment.write_at(128, b"balance")?;
/// segment.sync()?;
/// # Ok::<(), rvm_storage::StorageError>(())
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: Mutex<File>,
    len: u64,
}

impl FileBackend {
    /// Opens `path`, creating an empty file if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::with_options(path, OpenOptions::new().create(true).truncate(false))
    }

    /// Opens `path`, which must already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be opened.
    pub fn open_existing(path: &Path) -> StorageResult<Self> {
        Self::with_options(path, &mut OpenOptions::new())
    }

    fn with_options(path: &Path, options: &mut OpenOptions) -> StorageResult<Self> {
        let file = options.read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            len,
        })
    }

    /// Returns the file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        check_read(offset, len, self.len)?;
        let mut buf = vec![0u8; len];
        if len > 0 {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)?;
        }
        Ok(buf)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let file = self.file.get_mut();
        // A seek past the end leaves a hole that reads as zeros.
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        self.len = self.len.max(offset + data.len() as u64);
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> StorageResult<()> {
        self.file.get_mut().set_len(len)?;
        self.len = len;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.len)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.get_mut().flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.get_mut().sync_all()?;
        Ok(())
    }
}
