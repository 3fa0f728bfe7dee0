//! Registry of live mappings.

use crate::error::{CoreError, CoreResult};
use crate::types::{SegmentId, TransactionId};
use std::collections::HashMap;

/// A mapped segment and its in-memory contents.
#[derive(Debug)]
pub(crate) struct MappedSegment {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    /// Transaction currently holding the segment.
    pub(crate) owner: Option<TransactionId>,
}

impl MappedSegment {
    /// Checks that `[offset, offset + len)` lies inside the buffer.
    pub(crate) fn check_range(&self, offset: usize, len: usize) -> CoreResult<()> {
        let size = self.data.len();
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(()),
            _ => Err(CoreError::OutOfRange { offset, len, size }),
        }
    }

    /// Fails if a transaction holds this segment.
    pub(crate) fn ensure_unowned(&self) -> CoreResult<()> {
        match self.owner {
            Some(owner) => Err(CoreError::SegmentBusy {
                name: self.name.clone(),
                owner,
            }),
            None => Ok(()),
        }
    }
}

/// Live mappings indexed by ID and by name.
#[derive(Debug, Default)]
pub(crate) struct SegmentTable {
    by_id: HashMap<SegmentId, MappedSegment>,
    by_name: HashMap<String, SegmentId>,
    next_id: u64,
}

impl SegmentTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_mapped(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registers a new mapping and returns its ID.
    ///
    /// Callers must check `is_mapped` first.
    pub(crate) fn insert(&mut self, name: String, data: Vec<u8>) -> SegmentId {
        self.next_id += 1;
        let id = SegmentId::new(self.next_id);
        self.by_name.insert(name.clone(), id);
        self.by_id.insert(
            id,
            MappedSegment {
                name,
                data,
                owner: None,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: SegmentId) -> CoreResult<&MappedSegment> {
        self.by_id.get(&id).ok_or(CoreError::UnknownSegment)
    }

    pub(crate) fn get_mut(&mut self, id: SegmentId) -> CoreResult<&mut MappedSegment> {
        self.by_id.get_mut(&id).ok_or(CoreError::UnknownSegment)
    }

    pub(crate) fn remove(&mut self, id: SegmentId) -> Option<MappedSegment> {
        let segment = self.by_id.remove(&id)?;
        self.by_name.remove(&segment.name);
        Some(segment)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (SegmentId, &MappedSegment)> {
        self.by_id.iter().map(|(id, seg)| (*id, seg))
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }
}
