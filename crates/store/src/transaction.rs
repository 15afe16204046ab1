//! Transaction contexts
//!
//! A context is one unit of work against a [`LedgerStore`]:
//! - Reads go to the context's own staged writes first, then to the snapshot
//!   taken at `begin` (read-your-own-writes over snapshot isolation)
//! - Writes are staged in memory and only reach the store on commit
//! - Every snapshot read is recorded so commit can detect stale reads
//!
//! State machine: `Open -> {Committed, Discarded, Aborted}`. Only `Open`
//! accepts operations, and leaving it is final.

use crate::cursor::RangeCursor;
use crate::encoding::Decode;
use crate::entry::{Key, Record, StagedWrite, Version, VersionedEntry};
use crate::error::{Error, Result};
use crate::storage::{CommitReceipt, LedgerStore};
use ledger_common::TransactionId;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

/// Lifecycle state of a transaction context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    Discarded,
    /// Entered when the storage medium failed underneath the context
    Aborted,
}

impl TransactionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Open => "open",
            TransactionState::Committed => "committed",
            TransactionState::Discarded => "discarded",
            TransactionState::Aborted => "aborted",
        }
    }
}

/// A point read and the committed version it observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub key: Key,
    /// Version of the record (live or tombstone), `None` if never written
    pub observed: Option<Version>,
}

/// Key interval covered by a range cursor before it was released
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRange {
    pub start: Key,
    pub end: Bound<Key>,
}

/// Everything a context read from committed state, in read order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadSet {
    pub keys: Vec<ReadRecord>,
    pub ranges: Vec<ScannedRange>,
}

/// One atomic, identifiable unit of ledger reads and writes
pub struct TransactionContext<'a> {
    store: &'a LedgerStore,
    id: TransactionId,

    /// Committed state as of `begin`
    snapshot: fjall::Snapshot,
    begin_version: Version,

    state: Cell<TransactionState>,

    read_set: RefCell<ReadSet>,
    /// Keys already present in `read_set.keys`
    read_keys: RefCell<HashSet<Key>>,

    write_set: BTreeMap<Key, StagedWrite>,
}

impl<'a> TransactionContext<'a> {
    pub(crate) fn new(
        store: &'a LedgerStore,
        id: TransactionId,
        snapshot: fjall::Snapshot,
        begin_version: Version,
    ) -> Self {
        Self {
            store,
            id,
            snapshot,
            begin_version,
            state: Cell::new(TransactionState::Open),
            read_set: RefCell::new(ReadSet::default()),
            read_keys: RefCell::new(HashSet::new()),
            write_set: BTreeMap::new(),
        }
    }

    /// Unique identifier of this context
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state.get()
    }

    /// Last committed version visible to this context
    pub fn begin_version(&self) -> Version {
        self.begin_version
    }

    /// Reads recorded so far
    pub fn read_set(&self) -> ReadSet {
        self.read_set.borrow().clone()
    }

    /// Writes staged so far, ordered by key
    pub fn write_set(&self) -> &BTreeMap<Key, StagedWrite> {
        &self.write_set
    }

    /// Current entry for `key`, or `None` if absent or deleted
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<VersionedEntry>> {
        self.ensure_open()?;
        let key = Key::new(key, self.store.max_key_len())?;

        if let Some(write) = self.write_set.get(&key) {
            return Ok(write.value().map(|value| VersionedEntry {
                key: key.clone(),
                value: value.to_vec(),
                version: None,
            }));
        }

        let record = self.read_committed(&key)?;
        Ok(record.and_then(|r| r.into_entry(key)))
    }

    /// Stage `value` at `key`
    pub fn put(&mut self, key: impl AsRef<[u8]>, value: impl Into<Vec<u8>>) -> Result<()> {
        self.ensure_open()?;
        let key = Key::new(key, self.store.max_key_len())?;

        self.write_set.insert(key, StagedWrite::Put(value.into()));
        Ok(())
    }

    /// Stage a tombstone at `key`
    ///
    /// Returns whether a visible value was removed. Deleting an absent key
    /// changes nothing, but the absence is still recorded as a read.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> Result<bool> {
        self.ensure_open()?;
        let key = Key::new(key, self.store.max_key_len())?;

        let staged_put = matches!(self.write_set.get(&key), Some(StagedWrite::Put(_)));
        let committed_live = match self.read_committed(&key)? {
            Some(record) => !record.is_tombstone(),
            None => false,
        };

        if committed_live {
            self.write_set.insert(key, StagedWrite::Delete);
        } else {
            // Only our own staged value (if any) needs to go
            self.write_set.remove(&key);
        }

        Ok(committed_live || staged_put)
    }

    /// Lazily iterate entries with `start <= key < end` in ascending order
    ///
    /// The cursor sees the snapshot plus writes staged before it was opened.
    /// Releasing it (drop or [`RangeCursor::close`]) records the scanned
    /// interval in the read set.
    pub fn range(&self, start: impl AsRef<[u8]>, end: impl AsRef<[u8]>) -> Result<RangeCursor<'_>> {
        self.ensure_open()?;
        let start = Key::new(start, self.store.max_key_len())?;
        let end = Key::new(end, self.store.max_key_len())?;

        if end < start {
            return Err(Error::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let staged: Vec<(Key, StagedWrite)> = self
            .write_set
            .range(start.clone()..end.clone())
            .map(|(k, w)| (k.clone(), w.clone()))
            .collect();

        let committed = Box::new(
            self.snapshot
                .range(start.as_bytes().to_vec()..end.as_bytes().to_vec())
                .map(|result| {
                    result.map_err(fjall::Error::from).map(|(k, v)| {
                        let k_bytes: Box<[u8]> = k.to_vec().into_boxed_slice();
                        let v_bytes: Box<[u8]> = v.to_vec().into_boxed_slice();
                        (k_bytes, v_bytes)
                    })
                }),
        );

        Ok(RangeCursor::new(self, start, end, committed, staged))
    }

    /// Validate and atomically apply this context's writes
    ///
    /// Fails with `Conflict` if anything in the read set changed since it was
    /// read; nothing is applied in that case. Any error means nothing was
    /// applied.
    ///
    /// Once the write batch is applied the commit succeeds, even if flushing
    /// the journal afterwards fails. The receipt then has `durable: false`:
    /// the writes are visible but may be lost on a crash.
    pub fn commit(self) -> Result<CommitReceipt> {
        self.ensure_open()?;

        let read_set = self.read_set.borrow();
        let result =
            self.store
                .commit_context(self.id, self.begin_version, &read_set, &self.write_set);

        match &result {
            Ok(_) => self.state.set(TransactionState::Committed),
            Err(e) if e.is_fatal() => self.state.set(TransactionState::Aborted),
            Err(_) => self.state.set(TransactionState::Discarded),
        }
        result
    }

    /// Abandon all staged writes
    pub fn discard(self) {
        if self.state.get() == TransactionState::Open {
            self.state.set(TransactionState::Discarded);
            tracing::debug!(
                "Discarded transaction {} ({} staged writes)",
                self.id,
                self.write_set.len()
            );
        }
    }

    pub(crate) fn store(&self) -> &'a LedgerStore {
        self.store
    }

    /// Record a scanned interval once its cursor is released
    pub(crate) fn record_scan(&self, range: ScannedRange) {
        if self.state.get() == TransactionState::Open {
            self.read_set.borrow_mut().ranges.push(range);
        }
    }

    /// Move to `Aborted` if `error` is fatal, passing it through
    pub(crate) fn observe_error(&self, error: Error) -> Error {
        if error.is_fatal() && self.state.get() == TransactionState::Open {
            tracing::error!("Aborting transaction {}: {}", self.id, error);
            self.state.set(TransactionState::Aborted);
        }
        error
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state.get() {
            TransactionState::Open => Ok(()),
            state => Err(Error::TransactionClosed {
                id: self.id.to_string(),
                state: state.as_str(),
            }),
        }
    }

    /// Read `key` from the snapshot and record the observed version
    fn read_committed(&self, key: &Key) -> Result<Option<Record>> {
        let record = self
            .snapshot_record(key)
            .map_err(|e| self.observe_error(e))?;

        if self.read_keys.borrow_mut().insert(key.clone()) {
            self.read_set.borrow_mut().keys.push(ReadRecord {
                key: key.clone(),
                observed: record.as_ref().map(Record::version),
            });
        }
        Ok(record)
    }

    fn snapshot_record(&self, key: &Key) -> Result<Option<Record>> {
        match self.snapshot.get(key.as_bytes()).map_err(fjall::Error::from)? {
            Some(bytes) => Ok(Some(Record::decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl Drop for TransactionContext<'_> {
    fn drop(&mut self) {
        if self.state.get() == TransactionState::Open {
            self.state.set(TransactionState::Discarded);
            tracing::debug!("Dropped open transaction {}, discarding", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_failure_aborts_context() {
        let store = LedgerStore::temporary().unwrap();
        let mut ctx = store.begin();
        ctx.put("CERT0", b"value".to_vec()).unwrap();

        let error = ctx.observe_error(Error::StorageUnavailable("disk gone".to_string()));
        assert!(matches!(error, Error::StorageUnavailable(_)));
        assert_eq!(ctx.state(), TransactionState::Aborted);

        // Aborted is terminal
        assert!(matches!(
            ctx.get("CERT0"),
            Err(Error::TransactionClosed { state: "aborted", .. })
        ));
        assert!(matches!(
            ctx.put("CERT1", b"x".to_vec()),
            Err(Error::TransactionClosed { .. })
        ));
        assert!(ctx.range("CERT0", "CERT9").is_err());
        assert_eq!(store.open_cursors(), 0);

        ctx.discard();
        assert_eq!(store.begin().get("CERT0").unwrap(), None);
    }

    #[test]
    fn test_aborted_context_cannot_commit() {
        let store = LedgerStore::temporary().unwrap();
        let mut ctx = store.begin();
        ctx.put("CERT0", b"value".to_vec()).unwrap();
        ctx.observe_error(Error::StorageUnavailable("io".to_string()));

        assert!(matches!(ctx.commit(), Err(Error::TransactionClosed { .. })));
        assert_eq!(store.last_version(), Version::ZERO);
    }

    #[test]
    fn test_caller_errors_do_not_abort() {
        let store = LedgerStore::temporary().unwrap();
        let ctx = store.begin();

        ctx.observe_error(Error::InvalidKey("empty".to_string()));
        assert_eq!(ctx.state(), TransactionState::Open);
    }

    #[test]
    fn test_reads_are_recorded_once_in_order() {
        let store = LedgerStore::temporary().unwrap();
        let ctx = store.begin();

        ctx.get("CERT1").unwrap();
        ctx.get("CERT0").unwrap();
        ctx.get("CERT1").unwrap();

        let read_set = ctx.read_set();
        let keys: Vec<_> = read_set.keys.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["CERT1", "CERT0"]);
        assert!(read_set.keys.iter().all(|r| r.observed.is_none()));
    }

    #[test]
    fn test_own_writes_are_not_recorded_as_reads() {
        let store = LedgerStore::temporary().unwrap();
        let mut ctx = store.begin();

        ctx.put("CERT0", b"value".to_vec()).unwrap();
        ctx.get("CERT0").unwrap();

        assert!(ctx.read_set().keys.is_empty());
    }
}
