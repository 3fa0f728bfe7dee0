//! Segment store.
//!
//! A segment is a named, byte-addressable region backed by the file
//! `<store>/<name>`. Mapping a segment loads the whole file into an owned
//! buffer; the buffer is the only copy callers touch until the log is folded
//! back into the file.
//!
//! ## Invariants
//!
//! - A name is mapped by at most one live mapping at a time
//! - A backing file never shrinks; mapping a larger size zero-extends it
//! - A segment held by an open transaction cannot be unmapped

mod file;
mod name;
mod table;

pub(crate) use file::{check_segment_file, load_segment, remove_segment};
pub(crate) use name::validate_segment_name;
pub(crate) use table::{MappedSegment, SegmentTable};
