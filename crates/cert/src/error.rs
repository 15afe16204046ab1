//! Error types for the certificate contract

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CertError {
    #[error("Invalid smart contract function name: {0}")]
    UnknownFunction(String),

    #[error("Incorrect number of arguments for {function}: expecting {expected}, got {got}")]
    ArgumentCount {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("Malformed certificate at {key}: {source}")]
    Malformed {
        key: String,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] ledger_store::Error),
}

impl CertError {
    /// Whether retrying the same invocation could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CertError::Store(ledger_store::Error::Conflict { .. }))
    }
}

pub type Result<T> = std::result::Result<T, CertError>;
