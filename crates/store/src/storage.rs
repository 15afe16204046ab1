//! Ledger store backed by Fjall
//!
//! Provides:
//! - One flat, bytewise-ordered data partition holding a [`Record`] per key
//! - A store-wide commit sequence that versions every committed write
//! - Snapshot isolation for transaction contexts (Fjall snapshots)
//! - Optimistic validation and atomic apply of write sets under one commit lock

use crate::config::StorageConfig;
use crate::encoding::{Decode, Encode};
use crate::entry::{Key, Record, StagedWrite, Version};
use crate::error::{Error, Result};
use crate::transaction::{ReadSet, TransactionContext};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use ledger_common::{TransactionId, TransactionIdGenerator};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Last assigned commit version
const COMMIT_SEQ_KEY: &str = "_commit_seq";
/// Number of times the store has been opened, feeds transaction ids
const EPOCH_KEY: &str = "_epoch";

const DATA_PARTITION: &str = "ledger_data";
const METADATA_PARTITION: &str = "_metadata";

/// Versioned key-value ledger
///
/// All mutation goes through [`TransactionContext::commit`]; the store itself
/// exposes no write path.
pub struct LedgerStore {
    keyspace: Keyspace,
    metadata_partition: PartitionHandle,
    data_partition: PartitionHandle,

    persist_mode: PersistMode,
    max_key_len: usize,

    ids: TransactionIdGenerator,

    /// Serializes snapshot acquisition, validation, apply and purge
    commit_lock: Mutex<CommitState>,

    open_cursors: AtomicUsize,
}

/// State guarded by the commit lock
struct CommitState {
    /// Last committed version
    last: Version,
    /// Newest tombstone version removed by [`LedgerStore::purge_tombstones`]
    purged_through: Version,
}

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub id: TransactionId,
    /// Version assigned to the write set, `None` for read-only contexts
    pub version: Option<Version>,
    pub writes: usize,
    /// `false` if the writes are applied and visible but flushing them to
    /// the journal failed, so they may not survive a crash
    pub durable: bool,
}

impl LedgerStore {
    /// Open (or create) the store described by `config`
    pub fn open(config: StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let keyspace = fjall::Config::new(&config.data_dir)
            .cache_size(config.block_cache_size)
            .open()?;

        let metadata_partition = keyspace.open_partition(
            METADATA_PARTITION,
            PartitionCreateOptions::default()
                .block_size(16 * 1024)
                .compression(fjall::CompressionType::None),
        )?;

        let data_partition = keyspace.open_partition(
            DATA_PARTITION,
            PartitionCreateOptions::default()
                .block_size(64 * 1024)
                .compression(config.compression),
        )?;

        let last_version = match metadata_partition.get(COMMIT_SEQ_KEY)? {
            Some(bytes) => Version::new(u64::decode(&bytes)?),
            None => Version::ZERO,
        };

        let epoch = match metadata_partition.get(EPOCH_KEY)? {
            Some(bytes) => {
                let previous = u32::decode(&bytes)?;
                // Reusing an epoch would repeat transaction ids
                if previous >= TransactionIdGenerator::MAX_EPOCH {
                    return Err(Error::EpochsExhausted { epoch: previous });
                }
                previous + 1
            }
            None => 0,
        };
        metadata_partition.insert(EPOCH_KEY, epoch.encode()?)?;
        keyspace.persist(PersistMode::SyncAll)?;

        let ids = TransactionIdGenerator::new(config.replica_seed, epoch);
        tracing::info!(
            "Opened ledger store at {:?} (last version {}, epoch {}, replica seed {})",
            config.data_dir,
            last_version,
            epoch,
            ids.seed()
        );

        Ok(Self {
            keyspace,
            metadata_partition,
            data_partition,
            persist_mode: config.persist_mode,
            max_key_len: config.max_key_len,
            ids,
            commit_lock: Mutex::new(CommitState {
                last: last_version,
                purged_through: Version::ZERO,
            }),
            open_cursors: AtomicUsize::new(0),
        })
    }

    /// Open a store in a fresh temporary directory
    pub fn temporary() -> Result<Self> {
        Self::open(StorageConfig::default())
    }

    /// Begin a transaction with a generated identifier
    pub fn begin(&self) -> TransactionContext<'_> {
        self.begin_with_id(self.ids.next_id())
    }

    /// Begin a transaction with an identifier assigned by the ordering layer
    ///
    /// The caller guarantees `id` is unique among concurrent contexts.
    pub fn begin_with_id(&self, id: TransactionId) -> TransactionContext<'_> {
        // Snapshot and version must describe the same committed state
        let state = self.commit_lock.lock();
        let snapshot = self.data_partition.snapshot();
        let begin_version = state.last;
        drop(state);

        tracing::debug!("Begin transaction {} at {}", id, begin_version);
        TransactionContext::new(self, id, snapshot, begin_version)
    }

    /// Last committed version
    pub fn last_version(&self) -> Version {
        self.commit_lock.lock().last
    }

    /// Number of range cursors not yet released
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::Acquire)
    }

    /// Longest accepted key, in bytes
    pub fn max_key_len(&self) -> usize {
        self.max_key_len
    }

    /// Remove tombstones committed before `before`
    ///
    /// Visible state is unchanged. Purging erases the history that commit
    /// validation relies on, so afterwards:
    /// - a context that read a purged tombstone fails with `Conflict`
    /// - a context that scanned any range and began before the newest
    ///   purged tombstone fails with `Conflict`
    pub fn purge_tombstones(&self, before: Version) -> Result<usize> {
        let mut state = self.commit_lock.lock();

        let mut keys_to_delete = Vec::new();
        let mut newest = Version::ZERO;
        for result in self.data_partition.iter() {
            let (key, value) = result?;
            let record = Record::decode(&value)?;
            if record.is_tombstone() && record.version() < before {
                newest = newest.max(record.version());
                keys_to_delete.push(key.to_vec());
            }
        }

        let removed = keys_to_delete.len();
        if removed > 0 {
            let mut batch = self.keyspace.batch();
            for key in keys_to_delete {
                batch.remove(&self.data_partition, key);
            }
            batch.commit()?;
            state.purged_through = state.purged_through.max(newest);
            self.keyspace.persist(self.persist_mode)?;
        }

        tracing::debug!("Purged {} tombstones before {}", removed, before);
        Ok(removed)
    }

    pub(crate) fn cursor_opened(&self) {
        self.open_cursors.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn cursor_closed(&self) {
        self.open_cursors.fetch_sub(1, Ordering::AcqRel);
    }

    /// Latest committed record for `key`, ignoring snapshots
    fn current_record(&self, key: &Key) -> Result<Option<Record>> {
        match self.data_partition.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(Record::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Validate a context's read set and apply its write set atomically
    pub(crate) fn commit_context(
        &self,
        id: TransactionId,
        begin_version: Version,
        read_set: &ReadSet,
        write_set: &BTreeMap<Key, StagedWrite>,
    ) -> Result<CommitReceipt> {
        let mut state = self.commit_lock.lock();

        for read in &read_set.keys {
            let current = self.current_record(&read.key)?.map(|r| r.version());
            if current != read.observed {
                return Err(self.conflict(id, &read.key, current));
            }
        }

        if let Some(range) = read_set.ranges.first()
            && begin_version < state.purged_through
        {
            // Deletes inside the scanned ranges may no longer be visible
            return Err(self.conflict(id, &range.start, Some(state.purged_through)));
        }

        for range in &read_set.ranges {
            let bounds = (
                Bound::Included(range.start.as_bytes().to_vec()),
                match &range.end {
                    Bound::Included(key) => Bound::Included(key.as_bytes().to_vec()),
                    Bound::Excluded(key) => Bound::Excluded(key.as_bytes().to_vec()),
                    Bound::Unbounded => Bound::Unbounded,
                },
            );
            for result in self.data_partition.range(bounds) {
                let (key, value) = result?;
                let version = Record::decode(&value)?.version();
                if version > begin_version {
                    let key = Key::from_stored(key.to_vec());
                    return Err(self.conflict(id, &key, Some(version)));
                }
            }
        }

        if write_set.is_empty() {
            tracing::debug!("Committed read-only transaction {}", id);
            return Ok(CommitReceipt {
                id,
                version: None,
                writes: 0,
                durable: true,
            });
        }

        let version = state.last.next();
        let mut batch = self.keyspace.batch();
        for (key, write) in write_set {
            let record = write.to_record(version).encode()?;
            batch.insert(&self.data_partition, key.as_bytes(), record);
        }
        batch.insert(&self.metadata_partition, COMMIT_SEQ_KEY, version.get().encode()?);

        if let Err(e) = batch.commit() {
            tracing::error!("Commit of transaction {} failed: {}", id, e);
            return Err(e.into());
        }
        // The batch is visible from here on, so the sequence must advance
        // even if the persist below fails
        state.last = version;

        let durable = match self.keyspace.persist(self.persist_mode) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "Transaction {} applied at {} but persisting it failed: {}",
                    id,
                    version,
                    e
                );
                false
            }
        };

        tracing::debug!(
            "Committed transaction {} at {} ({} writes)",
            id,
            version,
            write_set.len()
        );

        Ok(CommitReceipt {
            id,
            version: Some(version),
            writes: write_set.len(),
            durable,
        })
    }

    fn conflict(&self, id: TransactionId, key: &Key, current: Option<Version>) -> Error {
        tracing::warn!(
            "Transaction {} conflicts on key {:?} (now at {:?})",
            id,
            key.to_string(),
            current
        );
        Error::Conflict {
            key: key.to_string(),
            current: current.map(Version::get),
        }
    }
}

impl Drop for LedgerStore {
    fn drop(&mut self) {
        // Ensure data is persisted on drop
        let _ = self.keyspace.persist(PersistMode::SyncAll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_bumps_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(dir.path().to_path_buf());

        for expected in 0u32..3 {
            let store = LedgerStore::open(config.clone()).unwrap();
            let stored = store.metadata_partition.get(EPOCH_KEY).unwrap().unwrap();
            assert_eq!(u32::decode(&stored).unwrap(), expected);
        }
    }

    #[test]
    fn test_open_refuses_to_reuse_epochs() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(dir.path().to_path_buf());

        {
            let store = LedgerStore::open(config.clone()).unwrap();
            store
                .metadata_partition
                .insert(EPOCH_KEY, TransactionIdGenerator::MAX_EPOCH.encode().unwrap())
                .unwrap();
        }

        let result = LedgerStore::open(config);
        assert!(matches!(
            result,
            Err(Error::EpochsExhausted { epoch }) if epoch == TransactionIdGenerator::MAX_EPOCH
        ));
    }
}
