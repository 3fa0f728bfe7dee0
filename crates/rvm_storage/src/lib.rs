//! # RVM Storage
//!
//! Byte stores underneath the recoverable virtual memory engine.
//!
//! A [`StorageBackend`] is a flat run of bytes with positional reads and
//! writes. It has no idea what it holds: the engine layers the log format
//! and the segment layout on top.
//!
//! - [`FileBackend`] keeps the bytes in a file. It backs the log and the
//!   segment files.
//! - [`InMemoryBackend`] keeps them in a shared vector, for tests that need
//!   to damage a log by hand.
//!
//! ```rust
//! use rvm_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.append(b"hello world")?;
//! backend.write_at(6, b"there")?;
//! assert_eq!(backend.read_all()?, b"hello there");
//! # Ok::<(), rvm_storage::StorageError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
