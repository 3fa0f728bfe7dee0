//! Crash and restart behavior.
//!
//! A crash is simulated by dropping the store without truncating, and by
//! editing the log file directly to leave a torn or damaged tail.

mod common;

use common::{commit_write, modify, Scratch};
use rvm_core::wal::{LogEntry, LOG_BEGIN_MAGIC};
use rvm_core::{CoreError, Store};
use std::fs::{self, OpenOptions};
use std::io::Write;

#[test]
fn committed_but_not_truncated_survives_restart() {
    let scratch = Scratch::new();
    {
        let store = scratch.open();
        let seg = store.map("seg", 64).unwrap();
        commit_write(&store, seg, 0, b"first");
        store.truncate_log().unwrap();
        commit_write(&store, seg, 5, b"second");
    }

    assert_eq!(scratch.segment_file("seg")[5..11], [0u8; 6]);

    let store = scratch.open();
    let seg = store.map("seg", 64).unwrap();
    assert_eq!(store.read(seg, 0, 11).unwrap(), b"firstsecond");
}

#[test]
fn in_flight_transaction_is_lost() {
    let scratch = Scratch::new();
    {
        let store = scratch.open();
        let seg = store.map("seg", 16).unwrap();
        commit_write(&store, seg, 0, b"done");

        let mut txn = store.begin(&[seg]).unwrap();
        modify(&store, &mut txn, seg, 0, b"half");
        // The store goes away with the transaction still open.
        drop(store);
        drop(txn);
    }

    let store = scratch.open();
    let seg = store.map("seg", 16).unwrap();
    assert_eq!(store.read(seg, 0, 4).unwrap(), b"done");
}

#[test]
fn torn_tail_is_discarded_and_repaired() {
    let scratch = Scratch::new();
    let good_len = {
        let store = scratch.open();
        let seg = store.map("seg", 16).unwrap();
        commit_write(&store, seg, 0, b"safe");
        fs::metadata(scratch.log_path()).unwrap().len()
    };

    // Half of a second entry, as if the process died mid-append.
    {
        let mut file = OpenOptions::new()
            .append(true)
            .open(scratch.log_path())
            .unwrap();
        file.write_all(&LOG_BEGIN_MAGIC).unwrap();
        file.write_all(&[1, 0, 1]).unwrap();
        file.write_all(&[0xAA; 40]).unwrap();
    }

    let store = scratch.open();
    assert_eq!(fs::metadata(scratch.log_path()).unwrap().len(), good_len);

    let seg = store.map("seg", 16).unwrap();
    assert_eq!(store.read(seg, 0, 4).unwrap(), b"safe");

    commit_write(&store, seg, 4, b"more");
    drop(store);

    let store = scratch.open();
    let seg = store.map("seg", 16).unwrap();
    assert_eq!(store.read(seg, 0, 8).unwrap(), b"safemore");
}

#[test]
fn partially_written_last_entry_is_never_replayed() {
    let scratch = Scratch::new();
    let first_len = {
        let store = scratch.open();
        let seg = store.map("seg", 16).unwrap();
        commit_write(&store, seg, 0, b"one");
        let first_len = fs::metadata(scratch.log_path()).unwrap().len();
        commit_write(&store, seg, 0, b"two");
        first_len
    };

    let log = fs::read(scratch.log_path()).unwrap();
    fs::write(scratch.log_path(), &log[..log.len() - 1]).unwrap();

    let store = scratch.open();
    let seg = store.map("seg", 16).unwrap();
    assert_eq!(store.read(seg, 0, 3).unwrap(), b"one");
    assert_eq!(store.log_summary().unwrap().size, first_len);
}

#[test]
fn damaged_entry_before_the_end_fails_open() {
    let scratch = Scratch::new();
    {
        let store = scratch.open();
        let seg = store.map("seg", 16).unwrap();
        commit_write(&store, seg, 0, b"one");
        commit_write(&store, seg, 0, b"two");
    }

    let mut log = fs::read(scratch.log_path()).unwrap();
    // Flip a payload byte of the first entry.
    log[40] ^= 0xFF;
    fs::write(scratch.log_path(), &log).unwrap();

    let err = Store::open(&scratch.path).unwrap_err();
    assert!(err.is_corruption(), "{err}");
}

#[test]
fn interrupted_fold_is_idempotent() {
    let scratch = Scratch::new();
    let store = scratch.open();
    let seg = store.map("seg", 16).unwrap();
    commit_write(&store, seg, 0, b"abcd");
    commit_write(&store, seg, 2, b"XY");

    let saved_log = fs::read(scratch.log_path()).unwrap();
    store.truncate_log().unwrap();
    store.unmap(seg).unwrap();
    drop(store);

    // Files were written but the log clear never happened.
    fs::write(scratch.log_path(), &saved_log).unwrap();

    let store = scratch.open();
    let seg = store.map("seg", 16).unwrap();
    assert_eq!(store.read(seg, 0, 4).unwrap(), b"abXY");

    store.unmap(seg).unwrap();
    store.truncate_log().unwrap();
    assert_eq!(&scratch.segment_file("seg")[..4], b"abXY");
}

#[test]
fn destroy_marker_survives_restart() {
    let scratch = Scratch::new();
    {
        let store = scratch.open();
        let seg = store.map("seg", 8).unwrap();
        commit_write(&store, seg, 0, b"old");
        store.unmap(seg).unwrap();
        store.destroy("seg").unwrap();
    }

    let store = scratch.open();
    let entries = store.log_entries().unwrap();
    assert!(matches!(entries.last(), Some(LogEntry::Destroy { segment }) if segment == "seg"));

    let seg = store.map("seg", 8).unwrap();
    assert_eq!(store.read(seg, 0, 8).unwrap(), vec![0u8; 8]);
}

#[test]
fn crash_between_destroy_entry_and_file_removal() {
    let scratch = Scratch::new();
    {
        let store = scratch.open();
        let seg = store.map("s", 4).unwrap();
        commit_write(&store, seg, 0, b"OLD!");
        store.truncate_log().unwrap();
        commit_write(&store, seg, 0, b"NEW!");
        store.unmap(seg).unwrap();
    }

    // The destroy entry reached the log but the file was never removed.
    {
        let frame = LogEntry::Destroy {
            segment: "s".to_string(),
        }
        .encode()
        .unwrap();
        let mut file = OpenOptions::new()
            .append(true)
            .open(scratch.log_path())
            .unwrap();
        file.write_all(&frame).unwrap();
    }
    assert_eq!(scratch.segment_file("s"), b"OLD!");

    let store = scratch.open();
    let seg = store.map("s", 4).unwrap();
    assert_eq!(store.read(seg, 0, 4).unwrap(), vec![0u8; 4]);
    store.unmap(seg).unwrap();

    let report = store.truncate_log().unwrap();
    assert_eq!(report.segments_zeroed, 1);
    assert_eq!(scratch.segment_file("s"), vec![0u8; 4]);

    let seg = store.map("s", 4).unwrap();
    assert_eq!(store.read(seg, 0, 4).unwrap(), vec![0u8; 4]);
}

#[test]
fn lock_is_released_when_store_drops() {
    let scratch = Scratch::new();
    let store = scratch.open();
    assert!(matches!(
        Store::open(&scratch.path),
        Err(CoreError::StoreLocked)
    ));
    drop(store);

    let reopened = scratch.open();
    assert!(reopened.log_summary().unwrap().pending.is_empty());
}
