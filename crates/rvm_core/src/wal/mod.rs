//! Write-ahead log for durability and crash recovery.
//!
//! Commits append the redo records of a transaction as one entry. The log is
//! the only thing written at commit time; segment files change only when the
//! log is folded by `truncate_log`.
//!
//! ## Entry Format
//!
//! ```text
//! | "RVMB" (4) | version (2) | type (1) | txid (8) | record_count (4) | body_len (8) |
//! | body (body_len) | crc32 (4) | "RVME" (4) |
//! ```
//!
//! A transaction body holds `record_count` redo records:
//!
//! ```text
//! | name_len (2) | name | offset (8) | length (4) | bytes (length) |
//! ```
//!
//! A destroy body holds a single `name_len | name`.
//!
//! ## Recovery Policy
//!
//! An entry is honored only if it is complete: header, body, matching CRC
//! and end marker. An incomplete final entry is a crash mid-append and is
//! discarded. A damaged entry followed by more data is corruption and stops
//! the store from opening.

mod iterator;
mod record;
mod writer;

pub use iterator::LogIterator;
pub use record::{
    compute_crc32, EntryHeader, LogEntry, LogEntryType, RedoRecord, HEADER_SIZE,
    LOG_BEGIN_MAGIC, LOG_END_MAGIC, LOG_VERSION, TRAILER_SIZE,
};
pub use writer::LogManager;
