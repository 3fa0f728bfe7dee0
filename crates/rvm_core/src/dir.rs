//! Store directory management.
//!
//! This module handles the file system layout for a store:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-process access
//! ├─ rvm.log           # Write-ahead log of committed redo records
//! ├─ accounts          # One backing file per segment, named after it
//! └─ ...
//! ```
//!
//! The LOCK file ensures only one `Store` can use the directory at a time.

use crate::config::{Config, LOCK_FILE, LOG_FILE};
use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Manages the store directory structure and file locking.
///
/// # Thread Safety
///
/// The `StoreDir` holds an exclusive lock on the store directory.
/// Only one `StoreDir` instance can exist per directory at a time.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path is empty, or longer than `config.max_prefix_len` once
    ///   made absolute with its parent's symlinks resolved
    /// - The path exists and is not a directory
    /// - The directory is missing and cannot be created
    /// - The directory is not writable
    /// - Another store holds the lock (returns `StoreLocked`)
    pub fn open(path: &Path, config: &Config) -> CoreResult<Self> {
        if path.as_os_str().is_empty() {
            return Err(CoreError::invalid_argument("store path is empty"));
        }
        let len = resolved_len(path)?;
        if len > config.max_prefix_len {
            return Err(CoreError::PathTooLong {
                len,
                max: config.max_prefix_len,
            });
        }

        if path.exists() {
            if !path.is_dir() {
                return Err(CoreError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }
        } else {
            if !config.create_if_missing {
                return Err(CoreError::StoreNotFound {
                    path: path.to_path_buf(),
                });
            }
            // Only the last component is created.
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.is_dir() {
                    return Err(CoreError::MissingParent {
                        path: path.to_path_buf(),
                    });
                }
            }
            fs::create_dir(path)?;
            debug!(path = %path.display(), "created store directory");
        }

        if fs::metadata(path)?.permissions().readonly() {
            return Err(CoreError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the log file.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }

    /// Returns the path of the backing file for a segment.
    #[must_use]
    pub fn segment_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Returns true if the name is used by the store itself.
    #[must_use]
    pub fn is_reserved(name: &str) -> bool {
        name == LOG_FILE || name == LOCK_FILE
    }

    /// Lists the names of segment backing files, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn list_segments(&self) -> CoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !Self::is_reserved(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Length in bytes of `path` once made absolute and its parent resolved.
///
/// Segment files are opened relative to this path, so the limit applies to
/// what the kernel sees rather than to the spelling the caller used.
fn resolved_len(path: &Path) -> CoreResult<usize> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    let resolved = match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) if parent.is_dir() => fs::canonicalize(parent)?.join(name),
        _ => absolute,
    };
    Ok(resolved.as_os_str().len())
}
