//! Error types for RVM core.

use crate::types::TransactionId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in RVM core operations.
///
/// Operations that produce a handle (`open`, `map`, `begin`) use the `Err`
/// variant as their failure sentinel. Operations without a natural result
/// (`unmap`, `destroy`, `about_to_modify`, `abort`, `commit`,
/// `truncate_log`) return an error for invalid input and leave all state
/// untouched.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] rvm_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An argument was empty, zero or otherwise unusable.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The resolved store directory path is longer than the configured
    /// prefix limit.
    #[error("resolved store path is {len} bytes, longer than the {max} byte limit")]
    PathTooLong {
        /// Length of the rejected path.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A non-directory file occupies the store path.
    #[error("not a directory: {}", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// The parent of the store directory does not exist.
    #[error("parent directory does not exist: {}", path.display())]
    MissingParent {
        /// The store path whose parent is missing.
        path: PathBuf,
    },

    /// The store directory does not exist and creation was disabled.
    #[error("store directory does not exist: {}", path.display())]
    StoreNotFound {
        /// The missing store path.
        path: PathBuf,
    },

    /// The store directory is not writable.
    #[error("store directory is not writable: {}", path.display())]
    PermissionDenied {
        /// The read-only directory.
        path: PathBuf,
    },

    /// Another `Store` holds the directory lock.
    #[error("store locked: another handle has exclusive access")]
    StoreLocked,

    /// A segment name is empty, reserved or contains forbidden characters.
    #[error("invalid segment name {name:?}: {reason}")]
    InvalidSegmentName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A segment name exceeds the configured length limit.
    #[error("segment name is {len} bytes, longer than the {max} byte limit")]
    SegmentNameTooLong {
        /// Length of the rejected name.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The segment is already mapped by a live mapping.
    #[error("segment already mapped: {name}")]
    AlreadyMapped {
        /// The segment name.
        name: String,
    },

    /// The segment is mapped, so it cannot be destroyed.
    #[error("segment is mapped and cannot be destroyed: {name}")]
    SegmentMapped {
        /// The segment name.
        name: String,
    },

    /// No backing file exists for the segment.
    #[error("segment not found: {name}")]
    SegmentNotFound {
        /// The segment name.
        name: String,
    },

    /// The handle is stale, foreign to this store, or never existed.
    #[error("unknown segment handle")]
    UnknownSegment,

    /// The segment belongs to an open transaction.
    #[error("segment {name} is held by {owner}")]
    SegmentBusy {
        /// The segment name.
        name: String,
        /// The transaction holding it.
        owner: TransactionId,
    },

    /// A byte range falls outside the mapped segment.
    #[error("range {offset}+{len} is outside segment of {size} bytes")]
    OutOfRange {
        /// Start of the range.
        offset: usize,
        /// Length of the range.
        len: usize,
        /// Mapped segment size.
        size: usize,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The log is corrupted or invalid.
    #[error("log corruption: {message}")]
    LogCorruption {
        /// Description of the corruption.
        message: String,
    },

    /// Checksum mismatch detected.
    #[error("checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: u32,
        /// Actual checksum.
        actual: u32,
    },
}

impl CoreError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a log corruption error.
    pub fn log_corruption(message: impl Into<String>) -> Self {
        Self::LogCorruption {
            message: message.into(),
        }
    }

    /// Creates an invalid segment name error.
    pub fn invalid_segment_name(name: &str, reason: &'static str) -> Self {
        Self::InvalidSegmentName {
            name: name.to_string(),
            reason,
        }
    }

    /// Returns true if the error reports damaged log contents.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::LogCorruption { .. } | Self::ChecksumMismatch { .. }
        )
    }
}
