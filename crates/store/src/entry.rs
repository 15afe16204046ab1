//! Keys, versions and the persisted record format
//!
//! Every key in the data partition maps to a [`Record`]:
//! `tag(1) | version(8, big-endian) | value`, where tag `0` is a live value
//! and tag `1` a tombstone. Tombstones keep the version of the delete so
//! that commit validation still sees the key's history.

use crate::encoding::{Decode, Encode};
use crate::error::{Error, Result};
use std::fmt;

const LIVE_TAG: u8 = 0;
const TOMBSTONE_TAG: u8 = 1;
const HEADER_LEN: usize = 9;

/// Validated ledger key
///
/// Keys are compared bytewise, which gives the total order used by range
/// scans on every replica.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<u8>);

impl Key {
    /// Validate `bytes` as a key of at most `max_len` bytes
    ///
    /// Keys must be non-empty printable ASCII.
    pub fn new(bytes: impl AsRef<[u8]>, max_len: usize) -> Result<Self> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(Error::InvalidKey("key is empty".to_string()));
        }
        if bytes.len() > max_len {
            return Err(Error::InvalidKey(format!(
                "key is {} bytes, maximum is {}",
                bytes.len(),
                max_len
            )));
        }
        if let Some(pos) = bytes.iter().position(|b| !(0x20..=0x7e).contains(b)) {
            return Err(Error::InvalidKey(format!(
                "non-printable byte 0x{:02x} at offset {}",
                bytes[pos], pos
            )));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Wrap bytes read back from storage without re-validating them
    pub(crate) fn from_stored(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Commit version, drawn from the store-wide commit sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// Version before any commit
    pub const ZERO: Version = Version(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A live `(key, value, version)` triple as seen by a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedEntry {
    pub key: Key,
    pub value: Vec<u8>,
    /// Commit version, or `None` for a write staged by the reading context
    pub version: Option<Version>,
}

/// Persisted state of a single key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Live { version: Version, value: Vec<u8> },
    Tombstone { version: Version },
}

impl Record {
    pub fn version(&self) -> Version {
        match self {
            Record::Live { version, .. } | Record::Tombstone { version } => *version,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Record::Tombstone { .. })
    }

    /// Turn into a visible entry, or `None` for tombstones
    pub fn into_entry(self, key: Key) -> Option<VersionedEntry> {
        match self {
            Record::Live { version, value } => Some(VersionedEntry {
                key,
                value,
                version: Some(version),
            }),
            Record::Tombstone { .. } => None,
        }
    }
}

impl Encode for Record {
    fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Record::Live { version, value } => {
                let mut buf = Vec::with_capacity(HEADER_LEN + value.len());
                buf.push(LIVE_TAG);
                buf.extend_from_slice(&version.0.to_be_bytes());
                buf.extend_from_slice(value);
                Ok(buf)
            }
            Record::Tombstone { version } => {
                let mut buf = Vec::with_capacity(HEADER_LEN);
                buf.push(TOMBSTONE_TAG);
                buf.extend_from_slice(&version.0.to_be_bytes());
                Ok(buf)
            }
        }
    }
}

impl Decode for Record {
    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Encoding(format!(
                "record header needs {} bytes, got {}",
                HEADER_LEN,
                bytes.len()
            )));
        }
        let version = Version(u64::decode(&bytes[1..HEADER_LEN])?);

        match bytes[0] {
            LIVE_TAG => Ok(Record::Live {
                version,
                value: bytes[HEADER_LEN..].to_vec(),
            }),
            TOMBSTONE_TAG if bytes.len() == HEADER_LEN => Ok(Record::Tombstone { version }),
            TOMBSTONE_TAG => Err(Error::Encoding("tombstone carries a value".to_string())),
            tag => Err(Error::Encoding(format!("Invalid record tag {}", tag))),
        }
    }
}

/// A write staged in a transaction context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedWrite {
    Put(Vec<u8>),
    Delete,
}

impl StagedWrite {
    /// Value visible to the staging context
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            StagedWrite::Put(value) => Some(value),
            StagedWrite::Delete => None,
        }
    }

    /// Record persisted when committed at `version`
    pub(crate) fn to_record(&self, version: Version) -> Record {
        match self {
            StagedWrite::Put(value) => Record::Live {
                version,
                value: value.clone(),
            },
            StagedWrite::Delete => Record::Tombstone { version },
        }
    }
}
