//! Per-segment undo logs.

use std::ops::Range;

/// Pre-image of a byte range, captured before the caller writes to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    offset: usize,
    before: Vec<u8>,
}

impl Modification {
    /// Returns the start of the range.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the length of the range.
    #[must_use]
    pub fn len(&self) -> usize {
        self.before.len()
    }

    /// Returns true if the range is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty()
    }

    /// Returns the bytes the range held when it was declared.
    #[must_use]
    pub fn before(&self) -> &[u8] {
        &self.before
    }

    /// Returns the covered byte range.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.before.len()
    }
}

/// Ordered pre-images for one segment within one transaction.
///
/// Entries are never coalesced. Overlapping declarations each get their own
/// entry, and [`UndoLog::rollback`] restores them newest first so the oldest
/// pre-image wins.
#[derive(Debug, Default)]
pub struct UndoLog {
    entries: Vec<Modification>,
}

impl UndoLog {
    /// Creates an empty undo log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures `data[range]` as a new entry.
    ///
    /// Returns `false` without recording anything if the range does not fit
    /// in `data`.
    pub fn record(&mut self, data: &[u8], range: Range<usize>) -> bool {
        let offset = range.start;
        match data.get(range) {
            Some(before) => {
                self.entries.push(Modification {
                    offset,
                    before: before.to_vec(),
                });
                true
            }
            None => false,
        }
    }

    /// Restores every entry into `data`, newest first, and empties the log.
    pub fn rollback(&mut self, data: &mut [u8]) {
        while let Some(m) = self.entries.pop() {
            if let Some(target) = data.get_mut(m.range()) {
                target.copy_from_slice(&m.before);
            }
        }
    }

    /// Returns the entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Modification> {
        self.entries.iter()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries without restoring them.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
