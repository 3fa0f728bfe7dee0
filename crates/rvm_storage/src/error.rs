//! Storage errors.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a [`crate::StorageBackend`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read reached past the stored bytes.
    #[error("read of {len} bytes at {offset} passes the end ({size} bytes stored)")]
    ReadPastEnd {
        /// Start of the read.
        offset: u64,
        /// Bytes requested.
        len: usize,
        /// Bytes stored.
        size: u64,
    },

    /// `truncate` was asked to grow the store.
    #[error("cannot truncate {current} bytes up to {requested}")]
    InvalidResize {
        /// Bytes stored.
        current: u64,
        /// Requested length.
        requested: u64,
    },

    /// The stored bytes do not fit in this process's address space.
    #[error("{size} bytes do not fit in memory")]
    TooLarge {
        /// Bytes stored.
        size: u64,
    },
}
