//! End-to-end segment and transaction scenarios.

mod common;

use common::{commit_write, modify, Scratch};
use rvm_core::{Config, CoreError, Store, TransactionState};
use std::fs;

const HELLO: &[u8] = b"Hello World!\n";

#[test]
fn hello_world_round_trip() {
    let scratch = Scratch::new();
    let store = scratch.open();

    let seg = store.map("testseg", 4096).unwrap();
    assert_eq!(store.read(seg, 0, 4096).unwrap(), vec![0u8; 4096]);

    commit_write(&store, seg, 0, HELLO);
    store.truncate_log().unwrap();
    store.unmap(seg).unwrap();

    let seg = store.map("testseg", 4096).unwrap();
    let bytes = store.read(seg, 0, 4096).unwrap();
    assert_eq!(&bytes[..HELLO.len()], HELLO);
    assert!(bytes[HELLO.len()..].iter().all(|&b| b == 0));
}

#[test]
fn overlapping_abort_restores_original() {
    let scratch = Scratch::new();
    let store = scratch.open();
    let seg = store.map("testseg", 4096).unwrap();

    let mut txn = store.begin(&[seg]).unwrap();
    modify(&store, &mut txn, seg, 0, b"0123456789");
    modify(&store, &mut txn, seg, 3, b"abcdefghij");
    assert_eq!(store.read(seg, 0, 13).unwrap(), b"012abcdefghij");

    store.abort(&mut txn).unwrap();
    assert_eq!(txn.state(), TransactionState::Aborted);
    assert_eq!(store.read(seg, 0, 13).unwrap(), vec![0u8; 13]);
}

#[test]
fn commit_without_truncate_leaves_file_unchanged() {
    let scratch = Scratch::new();
    let store = scratch.open();
    let seg = store.map("testseg", 64).unwrap();

    commit_write(&store, seg, 0, HELLO);
    assert_eq!(scratch.segment_file("testseg"), vec![0u8; 64]);
    assert!(fs::metadata(scratch.log_path()).unwrap().len() > 0);

    store.truncate_log().unwrap();
    let file = scratch.segment_file("testseg");
    assert_eq!(&file[..HELLO.len()], HELLO);
    assert_eq!(fs::metadata(scratch.log_path()).unwrap().len(), 0);
}

#[test]
fn committed_data_replayed_on_remap_before_truncate() {
    let scratch = Scratch::new();
    let store = scratch.open();
    let seg = store.map("testseg", 64).unwrap();

    commit_write(&store, seg, 10, b"logged");
    store.unmap(seg).unwrap();

    let seg = store.map("testseg", 64).unwrap();
    assert_eq!(store.read(seg, 10, 6).unwrap(), b"logged");
    assert_eq!(scratch.segment_file("testseg"), vec![0u8; 64]);
}

#[test]
fn second_map_of_same_name_fails() {
    let scratch = Scratch::new();
    let store = scratch.open();

    let seg = store.map("testseg", 100).unwrap();
    assert!(matches!(
        store.map("testseg", 100),
        Err(CoreError::AlreadyMapped { .. })
    ));

    store.unmap(seg).unwrap();
    assert!(store.map("testseg", 100).is_ok());
}

#[test]
fn growing_remap_zero_fills_and_preserves() {
    let scratch = Scratch::new();
    let store = scratch.open();

    let seg = store.map("grow", 16).unwrap();
    commit_write(&store, seg, 0, b"prefix");
    store.truncate_log().unwrap();
    store.unmap(seg).unwrap();

    let seg = store.map("grow", 4096).unwrap();
    let bytes = store.read(seg, 0, 4096).unwrap();
    assert_eq!(&bytes[..6], b"prefix");
    assert!(bytes[6..].iter().all(|&b| b == 0));
    assert_eq!(fs::metadata(scratch.path.join("grow")).unwrap().len(), 4096);
}

#[test]
fn shrinking_remap_keeps_whole_file() {
    let scratch = Scratch::new();
    let store = scratch.open();

    let seg = store.map("big", 1000).unwrap();
    store.unmap(seg).unwrap();

    let seg = store.map("big", 10).unwrap();
    assert_eq!(store.segment_len(seg).unwrap(), 1000);
    assert_eq!(fs::metadata(scratch.path.join("big")).unwrap().len(), 1000);
}

#[test]
fn undeclared_writes_are_lost() {
    let scratch = Scratch::new();
    let store = scratch.open();
    let seg = store.map("seg", 32).unwrap();

    let mut txn = store.begin(&[seg]).unwrap();
    store.write(seg, 0, b"not declared").unwrap();
    store.commit(&mut txn).unwrap();
    store.truncate_log().unwrap();
    store.unmap(seg).unwrap();

    let seg = store.map("seg", 32).unwrap();
    assert_eq!(store.read(seg, 0, 32).unwrap(), vec![0u8; 32]);
}

#[test]
fn uncommitted_and_aborted_changes_are_lost() {
    let scratch = Scratch::new();
    let store = scratch.open();
    let seg = store.map("seg", 32).unwrap();
    commit_write(&store, seg, 0, b"kept");

    let mut aborted = store.begin(&[seg]).unwrap();
    modify(&store, &mut aborted, seg, 0, b"gone");
    store.abort(&mut aborted).unwrap();
    assert_eq!(store.read(seg, 0, 4).unwrap(), b"kept");

    let mut open = store.begin(&[seg]).unwrap();
    modify(&store, &mut open, seg, 4, b"lost");
    drop(open);

    store.truncate_log().unwrap();
    store.unmap(seg).unwrap();
    let seg = store.map("seg", 32).unwrap();
    assert_eq!(store.read(seg, 0, 8).unwrap(), b"kept\0\0\0\0");
}

#[test]
fn repeated_declarations_both_count() {
    let scratch = Scratch::new();
    let store = scratch.open();
    let seg = store.map("seg", 32).unwrap();

    let mut txn = store.begin(&[seg]).unwrap();
    store.about_to_modify(&mut txn, seg, 0, 8).unwrap();
    store.about_to_modify(&mut txn, seg, 0, 8).unwrap();
    assert_eq!(txn.modification_count(), 2);

    store.write(seg, 0, b"twice!!!").unwrap();
    store.commit(&mut txn).unwrap();
    assert_eq!(store.log_summary().unwrap().records, 2);
}

#[test]
fn multi_segment_commit() {
    let scratch = Scratch::new();
    let store = scratch.open();
    let a = store.map("a", 16).unwrap();
    let b = store.map("b", 16).unwrap();

    let mut txn = store.begin(&[a, b]).unwrap();
    modify(&store, &mut txn, a, 0, b"alpha");
    modify(&store, &mut txn, b, 8, b"beta");
    store.commit(&mut txn).unwrap();

    let summary = store.log_summary().unwrap();
    assert_eq!(summary.transactions, 1);
    assert_eq!(summary.pending.get("a"), Some(&1));
    assert_eq!(summary.pending.get("b"), Some(&1));

    store.truncate_log().unwrap();
    assert_eq!(&scratch.segment_file("a")[..5], b"alpha");
    assert_eq!(&scratch.segment_file("b")[8..12], b"beta");
}

#[test]
fn disjoint_transactions_coexist() {
    let scratch = Scratch::new();
    let store = scratch.open();
    let a = store.map("a", 8).unwrap();
    let b = store.map("b", 8).unwrap();

    let mut ta = store.begin(&[a]).unwrap();
    let mut tb = store.begin(&[b]).unwrap();
    assert!(store.begin(&[a, b]).is_err());

    modify(&store, &mut ta, a, 0, b"A");
    modify(&store, &mut tb, b, 0, b"B");
    assert!(store.about_to_modify(&mut ta, b, 0, 1).is_err());

    store.commit(&mut tb).unwrap();
    store.abort(&mut ta).unwrap();
    assert_eq!(store.read(a, 0, 1).unwrap(), b"\0");
    assert_eq!(store.read(b, 0, 1).unwrap(), b"B");
}

#[test]
fn destroy_then_recreate_starts_empty() {
    let scratch = Scratch::new();
    let store = scratch.open();

    let seg = store.map("seg", 16).unwrap();
    commit_write(&store, seg, 0, b"stale");
    store.unmap(seg).unwrap();
    store.destroy("seg").unwrap();

    let seg = store.map("seg", 16).unwrap();
    assert_eq!(store.read(seg, 0, 16).unwrap(), vec![0u8; 16]);

    store.truncate_log().unwrap();
    assert_eq!(scratch.segment_file("seg"), vec![0u8; 16]);
}

#[test]
fn reopen_existing_store() {
    let scratch = Scratch::new();
    {
        let store = scratch.open();
        let seg = store.map("seg", 8).unwrap();
        commit_write(&store, seg, 0, b"persist");
        store.truncate_log().unwrap();
    }

    let store = Store::open_with_config(&scratch.path, Config::default().create_if_missing(false))
        .unwrap();
    let seg = store.map("seg", 8).unwrap();
    assert_eq!(store.read(seg, 0, 7).unwrap(), b"persist");
}

#[test]
fn open_rejects_bad_directories() {
    let scratch = Scratch::new();
    let parent = scratch.path.parent().unwrap().to_path_buf();

    assert!(Store::open("").is_err());
    assert!(matches!(
        Store::open(parent.join("x".repeat(140))),
        Err(CoreError::PathTooLong { .. })
    ));

    let file = parent.join("plainfile");
    fs::write(&file, b"").unwrap();
    assert!(matches!(
        Store::open(&file),
        Err(CoreError::NotADirectory { .. })
    ));

    assert!(matches!(
        Store::open(parent.join("missing").join("store")),
        Err(CoreError::MissingParent { .. })
    ));
}

#[test]
fn one_store_per_directory() {
    let scratch = Scratch::new();
    let first = scratch.open();
    assert!(matches!(
        Store::open(&scratch.path),
        Err(CoreError::StoreLocked)
    ));

    drop(first);
    assert!(Store::open(&scratch.path).is_ok());
}
