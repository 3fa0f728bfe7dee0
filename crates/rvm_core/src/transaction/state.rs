//! Transaction state.

use crate::error::{CoreError, CoreResult};
use crate::segment::SegmentTable;
use crate::store::StoreState;
use crate::transaction::UndoLog;
use crate::types::{SegmentHandle, StoreId, TransactionId};
use crate::wal::RedoRecord;
use parking_lot::Mutex;
use std::sync::Weak;
use tracing::warn;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been aborted.
    Aborted,
}

/// An open claim on a set of mapped segments.
///
/// Created by [`crate::Store::begin`] and ended by
/// [`crate::Store::commit`] or [`crate::Store::abort`]. Once ended, every
/// further operation on it is rejected without effect.
///
/// Dropping an active transaction aborts it. It must therefore not be
/// dropped inside a [`crate::Store::with_segment_mut`] closure.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    store: StoreId,
    state: TransactionState,
    /// Held segments in `begin` order, each with its own undo log.
    segments: Vec<(SegmentHandle, UndoLog)>,
    shared: Weak<Mutex<StoreState>>,
}

impl Transaction {
    pub(crate) fn new(
        id: TransactionId,
        store: StoreId,
        handles: &[SegmentHandle],
        shared: Weak<Mutex<StoreState>>,
    ) -> Self {
        Self {
            id,
            store,
            state: TransactionState::Active,
            segments: handles.iter().map(|h| (*h, UndoLog::new())).collect(),
            shared,
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Returns the handles this transaction was begun with.
    pub fn segments(&self) -> impl Iterator<Item = SegmentHandle> + '_ {
        self.segments.iter().map(|(h, _)| *h)
    }

    /// Returns true if the transaction holds `handle`.
    #[must_use]
    pub fn holds(&self, handle: SegmentHandle) -> bool {
        self.segments.iter().any(|(h, _)| *h == handle)
    }

    /// Returns the number of undo records across all held segments.
    #[must_use]
    pub fn modification_count(&self) -> usize {
        self.segments.iter().map(|(_, undo)| undo.len()).sum()
    }

    pub(crate) fn store(&self) -> StoreId {
        self.store
    }

    pub(crate) fn ensure_active(&self) -> CoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(CoreError::invalid_operation(format!(
                "{} is {:?}",
                self.id, self.state
            )))
        }
    }

    pub(crate) fn undo_mut(&mut self, handle: SegmentHandle) -> Option<&mut UndoLog> {
        self.segments
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .map(|(_, undo)| undo)
    }

    /// Builds redo records from the current bytes of every declared range.
    pub(crate) fn redo_records(&self, table: &SegmentTable) -> CoreResult<Vec<RedoRecord>> {
        let mut records = Vec::with_capacity(self.modification_count());
        for (handle, undo) in &self.segments {
            let segment = table.get(handle.id())?;
            for m in undo.iter() {
                let bytes = segment.data.get(m.range()).ok_or(CoreError::OutOfRange {
                    offset: m.offset(),
                    len: m.len(),
                    size: segment.data.len(),
                })?;
                records.push(RedoRecord {
                    segment: segment.name.clone(),
                    offset: m.offset() as u64,
                    data: bytes.to_vec(),
                });
            }
        }
        Ok(records)
    }

    /// Restores all pre-images, releases the segments and marks the
    /// transaction aborted.
    pub(crate) fn roll_back(&mut self, table: &mut SegmentTable) {
        for (handle, undo) in &mut self.segments {
            if let Ok(segment) = table.get_mut(handle.id()) {
                undo.rollback(&mut segment.data);
                if segment.owner == Some(self.id) {
                    segment.owner = None;
                }
            }
        }
        self.state = TransactionState::Aborted;
    }

    /// Discards the undo logs, releases the segments and marks the
    /// transaction committed.
    pub(crate) fn finish_commit(&mut self, table: &mut SegmentTable) {
        for (handle, undo) in &mut self.segments {
            undo.clear();
            if let Ok(segment) = table.get_mut(handle.id()) {
                if segment.owner == Some(self.id) {
                    segment.owner = None;
                }
            }
        }
        self.state = TransactionState::Committed;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.is_active() {
            return;
        }
        if let Some(shared) = self.shared.upgrade() {
            warn!(txid = %self.id, "active transaction dropped, rolling back");
            let mut state = shared.lock();
            self.roll_back(&mut state.segments);
        }
    }
}
