//! # RVM Core
//!
//! Recoverable virtual memory for a single process.
//!
//! A [`Store`] owns a directory holding one backing file per named segment
//! plus a write-ahead log. Segments are mapped into in-memory buffers,
//! grouped into transactions, and made durable by appending redo records to
//! the log at commit time. [`Store::truncate_log`] folds the log into the
//! segment files; mapping a segment replays whatever has not been folded yet.
//!
//! This crate provides:
//! - Segment store (map, unmap, destroy) with name and mapping invariants
//! - Undo records captured by `about_to_modify` and restored on abort
//! - Write-ahead log of redo record sets, durable on commit
//! - Crash recovery by replaying complete record sets
//!
//! ## Example
//!
//! ```rust,no_run
//! use rvm_core::Store;
//! use std::path::Path;
//!
//! let store = Store::open(Path::new("rvm_store"))?;
//! let seg = store.map("accounts", 4096)?;
//!
//! let mut txn = store.begin(&[seg])?;
//! store.about_to_modify(&mut txn, seg, 0, 13)?;
//! store.write(seg, 0, b"Hello World!\n")?;
//! store.commit(&mut txn)?;
//!
//! store.truncate_log()?;
//! store.unmap(seg)?;
//! # Ok::<(), rvm_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dir;
mod error;
mod recovery;
mod segment;
mod store;
mod transaction;
mod types;
pub mod wal;

pub use config::{Config, LOCK_FILE, LOG_FILE};
pub use dir::StoreDir;
pub use error::{CoreError, CoreResult};
pub use recovery::{FoldReport, LogScan, RecoveryCoordinator};
pub use store::{LogSummary, Store};
pub use transaction::{Modification, Transaction, TransactionState, UndoLog};
pub use types::{SegmentHandle, SegmentId, TransactionId};

/// Crate version, reported by the `rvm` binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
