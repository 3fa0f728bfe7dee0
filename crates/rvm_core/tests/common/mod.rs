//! Shared helpers for integration tests.

#![allow(dead_code)]

use rvm_core::{Config, SegmentHandle, Store, Transaction};
use std::path::PathBuf;
use tempfile::TempDir;

/// A scratch directory and the store path inside it.
pub struct Scratch {
    _temp: TempDir,
    pub path: PathBuf,
}

impl Scratch {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("store");
        Self { _temp: temp, path }
    }

    pub fn open(&self) -> Store {
        Store::open_with_config(&self.path, config()).unwrap()
    }

    pub fn log_path(&self) -> PathBuf {
        self.path.join(rvm_core::LOG_FILE)
    }

    pub fn segment_file(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.path.join(name)).unwrap()
    }
}

/// Skips fsync; durability across a real power loss is not under test.
pub fn config() -> Config {
    Config::default().sync_on_commit(false)
}

/// Declares and writes `bytes` at `offset` inside `txn`.
pub fn modify(store: &Store, txn: &mut Transaction, seg: SegmentHandle, offset: usize, bytes: &[u8]) {
    store.about_to_modify(txn, seg, offset, bytes.len()).unwrap();
    store.write(seg, offset, bytes).unwrap();
}

/// Runs one committed transaction writing `bytes` at `offset`.
pub fn commit_write(store: &Store, seg: SegmentHandle, offset: usize, bytes: &[u8]) {
    let mut txn = store.begin(&[seg]).unwrap();
    modify(store, &mut txn, seg, offset, bytes);
    store.commit(&mut txn).unwrap();
}

pub fn read_u64(store: &Store, seg: SegmentHandle, offset: usize) -> u64 {
    let bytes = store.read(seg, offset, 8).unwrap();
    u64::from_le_bytes(bytes.try_into().unwrap())
}
