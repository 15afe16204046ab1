//! Error types for the ledger store

use thiserror::Error;

/// Result type for ledger store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the store and transaction contexts
#[derive(Debug, Error)]
pub enum Error {
    /// Empty, over-long or non-printable key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// End key precedes start key
    #[error("Invalid range: end key {end:?} precedes start key {start:?}")]
    InvalidRange { start: String, end: String },

    /// A key in the read set changed after it was observed
    #[error("Conflict on key {key:?}: changed after it was read (now at {current:?})")]
    Conflict { key: String, current: Option<u64> },

    /// The durable medium failed; the enclosing context is aborted
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Operation issued on a context that is no longer open
    #[error("Transaction {id} is {state}")]
    TransactionClosed { id: String, state: &'static str },

    /// Every transaction id epoch has been used by a previous open
    #[error("Transaction id epochs exhausted (last epoch {epoch})")]
    EpochsExhausted { epoch: u32 },

    /// Persisted record could not be decoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl Error {
    /// Whether this error aborts the enclosing transaction context
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_) | Error::Encoding(_))
    }
}

impl From<fjall::Error> for Error {
    fn from(e: fjall::Error) -> Self {
        Error::StorageUnavailable(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::StorageUnavailable(e.to_string())
    }
}
