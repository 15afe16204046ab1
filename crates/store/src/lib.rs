//! Deterministic, versioned key-value ledger store
//!
//! This crate provides the state interface a ledger contract executes
//! against, built on top of Fjall. It supports:
//! - Point get/put and tombstone deletes over one bytewise-ordered keyspace
//! - Lazy, snapshot-consistent range cursors
//! - Transaction contexts with read-your-own-writes semantics
//! - Optimistic conflict detection and atomic, versioned commits
//!
//! # Example
//!
//! ```no_run
//! use ledger_store::LedgerStore;
//!
//! let store = LedgerStore::temporary()?;
//!
//! let mut ctx = store.begin();
//! ctx.put("CERT0", br#"{"id":"STUD0"}"#.to_vec())?;
//! ctx.commit()?;
//!
//! let ctx = store.begin();
//! for entry in ctx.range("CERT0", "CERT999")? {
//!     let entry = entry?;
//!     println!("{} @ {:?}", entry.key, entry.version);
//! }
//! # Ok::<(), ledger_store::Error>(())
//! ```

pub mod config;
pub mod cursor;
pub mod encoding;
pub mod entry;
pub mod error;
pub mod storage;
pub mod transaction;

// Re-export main types
pub use config::StorageConfig;
pub use cursor::RangeCursor;
pub use encoding::{Decode, Encode};
pub use entry::{Key, Record, StagedWrite, Version, VersionedEntry};
pub use error::{Error, Result};
pub use storage::{CommitReceipt, LedgerStore};
pub use transaction::{ReadRecord, ReadSet, ScannedRange, TransactionContext, TransactionState};

pub use fjall::{CompressionType, PersistMode};
pub use ledger_common::TransactionId;

/// Type alias for the fjall KV iterator
type FjallIter<'a> =
    Box<dyn Iterator<Item = std::result::Result<(Box<[u8]>, Box<[u8]>), fjall::Error>> + 'a>;
