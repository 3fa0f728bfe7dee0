//! Transactions and undo records.
//!
//! A transaction holds an exclusive claim on a set of mapped segments. Each
//! `about_to_modify` call pushes a pre-image onto the segment's undo log:
//!
//! - **abort** pops the undo logs in reverse order, restoring every byte
//! - **commit** turns each declared range into a redo record holding its
//!   current bytes and appends the set to the write-ahead log
//!
//! Either way the claims are released and the transaction becomes terminal.

mod state;
mod undo;

pub use state::{Transaction, TransactionState};
pub use undo::{Modification, UndoLog};
