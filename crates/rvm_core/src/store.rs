//! Store implementation.
//!
//! The `Store` is the main entry point. It owns the store directory, the
//! write-ahead log and the table of live mappings, and exposes every segment
//! and transaction operation.

use crate::config::Config;
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::recovery::{FoldReport, RecoveryCoordinator};
use crate::segment::{
    check_segment_file, load_segment, remove_segment, validate_segment_name, MappedSegment,
    SegmentTable,
};
use crate::transaction::Transaction;
use crate::types::{SegmentHandle, StoreId, TransactionId};
use crate::wal::{LogEntry, LogManager};
use parking_lot::Mutex;
use rvm_storage::FileBackend;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Mutable store state, shared with open transactions so that dropping an
/// active transaction can roll it back.
///
/// Lock order: this mutex before the log's.
#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) segments: SegmentTable,
    next_txid: u64,
}

/// Counts describing the unfolded log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSummary {
    /// Log size in bytes.
    pub size: u64,
    /// Committed transactions not yet folded.
    pub transactions: usize,
    /// Destroy entries not yet folded.
    pub destroys: usize,
    /// Redo records across all transactions.
    pub records: usize,
    /// Redo records still to be applied, per segment.
    pub pending: BTreeMap<String, usize>,
}

/// A recoverable virtual memory store.
///
/// # Example
///
/// ```rust,no_run
/// use rvm_core::Store;
///
/// let store = Store::open("rvm_store")?;
/// let seg = store.map("counter", 8)?;
///
/// let mut txn = store.begin(&[seg])?;
/// store.about_to_modify(&mut txn, seg, 0, 8)?;
/// store.write(seg, 0, &1u64.to_le_bytes())?;
/// store.commit(&mut txn)?;
/// # Ok::<(), rvm_core::CoreError>(())
/// ```
///
/// # Thread Safety
///
/// `Store` is `Send + Sync`. All state sits behind one mutex, so calls from
/// several threads are serialized.
#[derive(Debug)]
pub struct Store {
    id: StoreId,
    config: Config,
    state: Arc<Mutex<StoreState>>,
    log: LogManager,
    // Dropped last so the lock outlives every other handle.
    dir: StoreDir,
}

impl Store {
    /// Opens a store with default configuration.
    ///
    /// Creates the directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// See [`Store::open_with_config`].
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a store with custom configuration.
    ///
    /// Recovery runs as part of opening: the log is scanned, an incomplete
    /// trailing entry left by a crash is cut off, and transaction IDs resume
    /// past the highest committed one.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path is empty or too long
    /// - The path is a file, or its parent doesn't exist
    /// - The directory is read-only or locked by another store
    /// - The log is corrupted
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let dir = StoreDir::open(path.as_ref(), &config)?;

        let backend = FileBackend::open(&dir.log_path())?;
        let log = LogManager::new(Box::new(backend), config.sync_on_commit);

        let scan = RecoveryCoordinator::scan(&log)?;
        if scan.torn_bytes > 0 {
            warn!(
                bytes = scan.torn_bytes,
                offset = scan.valid_end,
                "discarding incomplete log tail"
            );
            log.truncate(scan.valid_end)?;
        }

        info!(
            path = %dir.path().display(),
            transactions = scan.transactions,
            records = scan.records,
            "opened store"
        );

        let next_txid = scan.max_txid.map_or(1, |id| id.as_u64() + 1);
        Ok(Self {
            id: StoreId::next(),
            config,
            state: Arc::new(Mutex::new(StoreState {
                segments: SegmentTable::new(),
                next_txid,
            })),
            log,
            dir,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Maps a segment, creating its backing file if needed.
    ///
    /// The file is zero-extended to `size` if shorter. The buffer holds the
    /// whole file, so it may be longer than `size`. Committed redo records
    /// not yet folded into the file are replayed onto the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already mapped, if `size`
    /// is zero, or if the file cannot be loaded.
    pub fn map(&self, name: &str, size: usize) -> CoreResult<SegmentHandle> {
        validate_segment_name(name, self.config.max_segment_name_len)?;
        if size == 0 {
            return Err(CoreError::invalid_argument("segment size must be positive"));
        }

        let mut state = self.state.lock();
        if state.segments.is_mapped(name) {
            return Err(CoreError::AlreadyMapped {
                name: name.to_string(),
            });
        }

        let mut data = load_segment(&self.dir.segment_path(name), size)?;
        let replayed = RecoveryCoordinator::replay_segment(&self.log, name, &mut data)?;

        let len = data.len();
        let id = state.segments.insert(name.to_string(), data);
        debug!(segment = name, %id, len, replayed, "mapped segment");
        Ok(SegmentHandle::new(self.id, id))
    }

    /// Unmaps a segment, discarding its buffer.
    ///
    /// Changes not committed are lost; committed ones live in the log or
    /// the file and are visible to the next `map`.
    ///
    /// # Errors
    ///
    /// Returns an error without effect if the handle is stale or foreign,
    /// or if an active transaction holds the segment.
    pub fn unmap(&self, handle: SegmentHandle) -> CoreResult<()> {
        self.check_handle(handle)?;
        let mut state = self.state.lock();
        state.segments.get(handle.id())?.ensure_unowned()?;

        if let Some(segment) = state.segments.remove(handle.id()) {
            debug!(segment = %segment.name, id = %handle.id(), "unmapped segment");
        }
        Ok(())
    }

    /// Deletes a segment's backing file.
    ///
    /// A destroy entry is logged first, so redo records committed for the
    /// old segment are never replayed onto a new one with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error without effect if the name is invalid, the segment
    /// is mapped, or its backing file is missing or not a regular file.
    pub fn destroy(&self, name: &str) -> CoreResult<()> {
        validate_segment_name(name, self.config.max_segment_name_len)?;

        let state = self.state.lock();
        if state.segments.is_mapped(name) {
            return Err(CoreError::SegmentMapped {
                name: name.to_string(),
            });
        }

        let path = self.dir.segment_path(name);
        check_segment_file(&path, name)?;

        self.log.append(&LogEntry::Destroy {
            segment: name.to_string(),
        })?;
        remove_segment(&path, name)?;
        drop(state);

        debug!(segment = name, "destroyed segment");
        Ok(())
    }

    /// Begins a transaction holding every segment in `segments`.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving every segment and transaction untouched,
    /// if `segments` is empty, has duplicates, or names a segment that is
    /// not mapped by this store or is held by another transaction.
    pub fn begin(&self, segments: &[SegmentHandle]) -> CoreResult<Transaction> {
        if segments.is_empty() {
            return Err(CoreError::invalid_argument("transaction needs at least one segment"));
        }

        let mut seen = HashSet::with_capacity(segments.len());
        for handle in segments {
            self.check_handle(*handle)?;
            if !seen.insert(handle.id()) {
                return Err(CoreError::invalid_argument(format!(
                    "{handle} listed twice"
                )));
            }
        }

        let mut state = self.state.lock();
        for handle in segments {
            state.segments.get(handle.id())?.ensure_unowned()?;
        }

        let txid = TransactionId::new(state.next_txid);
        state.next_txid += 1;
        for handle in segments {
            state.segments.get_mut(handle.id())?.owner = Some(txid);
        }

        debug!(%txid, segments = segments.len(), "began transaction");
        Ok(Transaction::new(
            txid,
            self.id,
            segments,
            Arc::downgrade(&self.state),
        ))
    }

    /// Records the current bytes of `[offset, offset + len)` so they can be
    /// restored if the transaction aborts.
    ///
    /// Every call appends a new undo record, even for a range already
    /// declared. A zero-length range is accepted and records nothing.
    ///
    /// # Errors
    ///
    /// Returns an error without effect if the transaction is not active or
    /// belongs to another store, if it does not hold the segment, or if the
    /// range falls outside the segment.
    pub fn about_to_modify(
        &self,
        txn: &mut Transaction,
        handle: SegmentHandle,
        offset: usize,
        len: usize,
    ) -> CoreResult<()> {
        self.check_transaction(txn)?;
        self.check_handle(handle)?;
        let txid = txn.id();
        let undo = txn.undo_mut(handle).ok_or_else(|| {
            CoreError::invalid_operation(format!("{handle} is not held by {txid}"))
        })?;

        let state = self.state.lock();
        let segment = state.segments.get(handle.id())?;
        segment.check_range(offset, len)?;
        if len == 0 {
            return Ok(());
        }

        undo.record(&segment.data, offset..offset + len);
        Ok(())
    }

    /// Aborts a transaction, restoring every declared range newest first.
    ///
    /// # Errors
    ///
    /// Returns an error without effect if the transaction is terminal or
    /// belongs to another store.
    pub fn abort(&self, txn: &mut Transaction) -> CoreResult<()> {
        self.check_transaction(txn)?;

        let mut state = self.state.lock();
        let modifications = txn.modification_count();
        txn.roll_back(&mut state.segments);

        debug!(txid = %txn.id(), modifications, "aborted transaction");
        Ok(())
    }

    /// Commits a transaction.
    ///
    /// The redo records are appended to the log as one entry, fsynced when
    /// `sync_on_commit` is set. Segment files are not touched until
    /// [`Store::truncate_log`]. A transaction that declared nothing writes
    /// nothing to the log.
    ///
    /// # Errors
    ///
    /// Returns an error without effect if the transaction is terminal or
    /// belongs to another store. If the log append fails the transaction
    /// stays active and can still be aborted.
    pub fn commit(&self, txn: &mut Transaction) -> CoreResult<()> {
        self.check_transaction(txn)?;

        let mut state = self.state.lock();
        let records = txn.redo_records(&state.segments)?;
        let count = records.len();
        if !records.is_empty() {
            self.log.append(&LogEntry::Transaction {
                txid: txn.id(),
                records,
            })?;
        }
        txn.finish_commit(&mut state.segments);

        debug!(txid = %txn.id(), records = count, "committed transaction");
        Ok(())
    }

    /// Folds the log into the segment files and clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or a segment file cannot
    /// be written; the log is kept in that case.
    pub fn truncate_log(&self) -> CoreResult<FoldReport> {
        let _state = self.state.lock();
        RecoveryCoordinator::fold(&self.log, &self.dir)
    }

    /// Copies `len` bytes starting at `offset` out of a mapped segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live or the range is out of
    /// bounds.
    pub fn read(&self, handle: SegmentHandle, offset: usize, len: usize) -> CoreResult<Vec<u8>> {
        self.with_mapped(handle, |segment| {
            segment.check_range(offset, len)?;
            Ok(segment.data[offset..offset + len].to_vec())
        })
    }

    /// Writes `bytes` into a mapped segment at `offset`.
    ///
    /// This only changes the in-memory buffer. The write is durable only
    /// if the range was declared with [`Store::about_to_modify`] in a
    /// transaction that commits.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live or the range is out of
    /// bounds.
    pub fn write(&self, handle: SegmentHandle, offset: usize, bytes: &[u8]) -> CoreResult<()> {
        self.check_handle(handle)?;
        let mut state = self.state.lock();
        let segment = state.segments.get_mut(handle.id())?;
        segment.check_range(offset, bytes.len())?;
        segment.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Runs `f` with the segment's bytes.
    ///
    /// The store is locked for the duration of `f`; calling back into the
    /// store from `f` deadlocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live.
    pub fn with_segment<R>(&self, handle: SegmentHandle, f: impl FnOnce(&[u8]) -> R) -> CoreResult<R> {
        self.with_mapped(handle, |segment| Ok(f(&segment.data)))
    }

    /// Runs `f` with mutable access to the segment's bytes.
    ///
    /// The same durability rule as [`Store::write`] applies, and the same
    /// locking caveat as [`Store::with_segment`].
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live.
    pub fn with_segment_mut<R>(
        &self,
        handle: SegmentHandle,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> CoreResult<R> {
        self.check_handle(handle)?;
        let mut state = self.state.lock();
        let segment = state.segments.get_mut(handle.id())?;
        Ok(f(&mut segment.data))
    }

    /// Returns the length of a mapped segment's buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live.
    pub fn segment_len(&self, handle: SegmentHandle) -> CoreResult<usize> {
        self.with_mapped(handle, |segment| Ok(segment.data.len()))
    }

    /// Returns the name of a mapped segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is not live.
    pub fn segment_name(&self, handle: SegmentHandle) -> CoreResult<String> {
        self.with_mapped(handle, |segment| Ok(segment.name.clone()))
    }

    /// Returns the live mappings, sorted by name.
    #[must_use]
    pub fn mapped_segments(&self) -> Vec<(String, SegmentHandle)> {
        let state = self.state.lock();
        let mut mapped = Vec::with_capacity(state.segments.len());
        for (id, segment) in state.segments.iter() {
            mapped.push((segment.name.clone(), SegmentHandle::new(self.id, id)));
        }
        mapped.sort_by(|a, b| a.0.cmp(&b.0));
        mapped
    }

    /// Lists the segment backing files in the store directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub fn segment_files(&self) -> CoreResult<Vec<String>> {
        self.dir.list_segments()
    }

    /// Summarizes the unfolded log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn log_summary(&self) -> CoreResult<LogSummary> {
        let _state = self.state.lock();
        let scan = RecoveryCoordinator::scan(&self.log)?;
        Ok(LogSummary {
            size: self.log.size()?,
            transactions: scan.transactions,
            destroys: scan.destroys,
            records: scan.records,
            pending: scan.pending,
        })
    }

    /// Returns every unfolded log entry in log order.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn log_entries(&self) -> CoreResult<Vec<LogEntry>> {
        let _state = self.state.lock();
        self.log.read_all()
    }

    fn check_handle(&self, handle: SegmentHandle) -> CoreResult<()> {
        if handle.store() == self.id {
            Ok(())
        } else {
            Err(CoreError::UnknownSegment)
        }
    }

    fn check_transaction(&self, txn: &Transaction) -> CoreResult<()> {
        if txn.store() != self.id {
            return Err(CoreError::invalid_operation(format!(
                "{} belongs to another store",
                txn.id()
            )));
        }
        txn.ensure_active()
    }

    fn with_mapped<R>(
        &self,
        handle: SegmentHandle,
        f: impl FnOnce(&MappedSegment) -> CoreResult<R>,
    ) -> CoreResult<R> {
        self.check_handle(handle)?;
        let state = self.state.lock();
        f(state.segments.get(handle.id())?)
    }
}
