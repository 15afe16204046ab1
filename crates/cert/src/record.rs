//! Certificate records as stored on the ledger

use serde::{Deserialize, Serialize};

/// One issued certificate, stored as JSON under its ledger key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cert {
    /// Holder id, unique per person
    pub id: String,
    #[serde(rename = "sname")]
    pub name: String,
    #[serde(rename = "cname")]
    pub cert_name: String,
    #[serde(rename = "cdets", default)]
    pub details: String,
    #[serde(rename = "org")]
    pub organisation: String,
    /// Id of the transaction that wrote the record
    #[serde(rename = "txhash")]
    pub tx_hash: String,
}

impl Cert {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// A certificate together with its ledger key, as returned by range queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertEntry {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Record")]
    pub record: Cert,
}
