//! Segment backing files.

use crate::error::{CoreError, CoreResult};
use rvm_storage::{FileBackend, StorageBackend};
use std::fs;
use std::io;
use std::path::Path;

/// Loads a segment's backing file, creating or zero-extending it to `size`.
///
/// The returned buffer holds the whole file, so it is at least `size` bytes
/// long and longer when the file was previously mapped at a larger size.
pub(crate) fn load_segment(path: &Path, size: usize) -> CoreResult<Vec<u8>> {
    let mut backend = FileBackend::open(path)?;
    let requested = size as u64;

    if backend.size()? < requested {
        backend.extend_to(requested)?;
        backend.sync()?;
    }

    Ok(backend.read_all()?)
}

/// Fails unless `path` is a regular file. Symlinks are not followed.
pub(crate) fn check_segment_file(path: &Path, name: &str) -> CoreResult<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(CoreError::invalid_segment_name(name, "not a regular file")),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(CoreError::SegmentNotFound {
            name: name.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Deletes a segment's backing file.
pub(crate) fn remove_segment(path: &Path, name: &str) -> CoreResult<()> {
    check_segment_file(path, name)?;
    fs::remove_file(path)?;
    Ok(())
}
