//! Segment name validation.

use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};

/// Checks that `name` can be used as a segment file name.
pub(crate) fn validate_segment_name(name: &str, max_len: usize) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::invalid_segment_name(name, "name is empty"));
    }
    if name.len() > max_len {
        return Err(CoreError::SegmentNameTooLong {
            len: name.len(),
            max: max_len,
        });
    }
    if name == "." || name == ".." {
        return Err(CoreError::invalid_segment_name(name, "name refers to a directory"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(CoreError::invalid_segment_name(name, "name contains a path separator"));
    }
    if name.contains('\0') {
        return Err(CoreError::invalid_segment_name(name, "name contains NUL"));
    }
    if StoreDir::is_reserved(name) {
        return Err(CoreError::invalid_segment_name(name, "name is reserved by the store"));
    }
    Ok(())
}
