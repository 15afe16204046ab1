//! Responses returned by the certificate contract

use crate::record::{Cert, CertEntry};
use serde::{Deserialize, Serialize};

/// Result of one contract invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertResponse {
    /// Result of `queryCert`, `None` if nothing is stored under the key
    Cert(Option<Cert>),

    /// Result of `initLedger`
    Initialized { keys: Vec<String> },

    /// Result of `createCert`
    Created { key: String, tx_hash: String },

    /// Result of `queryAllCerts`, in key order
    AllCerts(Vec<CertEntry>),
}

impl CertResponse {
    /// Response body as the dispatch layer returns it to clients
    ///
    /// Queries return JSON (a record, or an array of `{"Key", "Record"}`
    /// objects). Writes and missing records return an empty body.
    pub fn payload(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            CertResponse::Cert(Some(cert)) => cert.to_json(),
            CertResponse::AllCerts(entries) => serde_json::to_vec(entries),
            CertResponse::Cert(None)
            | CertResponse::Initialized { .. }
            | CertResponse::Created { .. } => Ok(Vec::new()),
        }
    }
}
