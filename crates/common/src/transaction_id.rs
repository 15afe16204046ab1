//! Transaction identifier
//!
//! Identifiers are 16-byte UUIDs compared bytewise. Ledger execution must be
//! deterministic, so identifiers are normally produced by a
//! [`TransactionIdGenerator`] (replica seed + open epoch + counter) or
//! supplied by the consensus layer, never from wall-clock time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Bits of the low word reserved for the per-epoch counter
const COUNTER_BITS: u32 = 40;
const COUNTER_MASK: u64 = (1 << COUNTER_BITS) - 1;

/// Transaction identifier with a deterministic total ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(Uuid);

impl TransactionId {
    /// Create from existing UUID (consensus-assigned ids, deserialization)
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build an identifier from a replica seed and a sequence number
    pub fn from_parts(seed: u64, sequence: u64) -> Self {
        Self(Uuid::from_u64_pair(seed, sequence))
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Convert to bytes (16 bytes, big-endian)
    pub fn to_bytes(&self) -> [u8; 16] {
        *self.0.as_bytes()
    }

    /// Parse from bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parse from string representation
    pub fn parse(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid transaction ID: {}", e))
    }

    /// Derive a distinct, reproducible identifier scoped to this transaction
    ///
    /// Used when one transaction writes several logically distinct records
    /// that each need their own identifier. Every replica derives the same
    /// value for the same `(self, index)`.
    pub fn derive(&self, index: u64) -> Self {
        Self(Uuid::new_v5(&self.0, &index.to_be_bytes()))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for TransactionId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TransactionId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Lexicographic comparison of bytes provides total ordering
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

/// Generates collision-free transaction ids for one replica
///
/// Layout: high word = replica seed, low word = `epoch << 40 | counter`.
/// The epoch is bumped every time the owning store is reopened, so ids
/// never repeat across restarts of the same replica.
#[derive(Debug)]
pub struct TransactionIdGenerator {
    seed: u64,
    epoch: u64,
    next: AtomicU64,
}

impl TransactionIdGenerator {
    /// Largest epoch that fits beside the counter in the low word
    pub const MAX_EPOCH: u32 = (1 << (64 - COUNTER_BITS)) - 1;

    /// Create a generator for `seed` in the given open `epoch`
    ///
    /// Only the low 24 bits of `epoch` are used; callers must not reuse an
    /// epoch once it exceeds [`Self::MAX_EPOCH`].
    pub fn new(seed: u64, epoch: u32) -> Self {
        Self {
            seed,
            epoch: u64::from(epoch & Self::MAX_EPOCH) << COUNTER_BITS,
            next: AtomicU64::new(0),
        }
    }

    /// Replica seed this generator was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Allocate the next identifier
    pub fn next_id(&self) -> TransactionId {
        let counter = self.next.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
        TransactionId::from_parts(self.seed, self.epoch | counter)
    }
}
