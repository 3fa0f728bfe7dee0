//! Benchmark utilities.

use rand::Rng;
use rvm_core::{Config, SegmentHandle, Store};
use tempfile::TempDir;

/// Generate random payload data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// A store in a scratch directory, removed on drop.
pub struct BenchStore {
    /// The open store.
    pub store: Store,
    _dir: TempDir,
}

impl BenchStore {
    /// Opens a fresh store. `sync` controls fsync on commit.
    pub fn new(sync: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store =
            Store::open_with_config(dir.path().join("store"), Config::default().sync_on_commit(sync))
                .unwrap();
        Self { store, _dir: dir }
    }

    /// Maps `count` segments of `size` bytes named `seg0`, `seg1`, ...
    pub fn map_segments(&self, count: usize, size: usize) -> Vec<SegmentHandle> {
        (0..count)
            .map(|i| self.store.map(&format!("seg{i}"), size).unwrap())
            .collect()
    }

    /// Commits one transaction writing `data` at `offset` in every segment.
    pub fn commit_all(&self, segs: &[SegmentHandle], offset: usize, data: &[u8]) {
        let mut txn = self.store.begin(segs).unwrap();
        for &seg in segs {
            self.store
                .about_to_modify(&mut txn, seg, offset, data.len())
                .unwrap();
            self.store.write(seg, offset, data).unwrap();
        }
        self.store.commit(&mut txn).unwrap();
    }
}
