//! Encoding/decoding traits for persisted ledger data
//!
//! Records and metadata use small fixed layouts, so the store defines its own
//! codecs instead of going through a general serialization framework.

use crate::error::{Error, Result};

/// Encode a value to bytes
pub trait Encode {
    fn encode(&self) -> Result<Vec<u8>>;
}

/// Decode a value from bytes
pub trait Decode: Sized {
    fn decode(bytes: &[u8]) -> Result<Self>;
}

impl Encode for u64 {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_be_bytes().to_vec())
    }
}

impl Decode for u64 {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let buf: [u8; 8] = bytes.try_into().map_err(|_| {
            Error::Encoding(format!("Expected 8 bytes for u64, got {}", bytes.len()))
        })?;
        Ok(u64::from_be_bytes(buf))
    }
}

impl Encode for u32 {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_be_bytes().to_vec())
    }
}

impl Decode for u32 {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let buf: [u8; 4] = bytes.try_into().map_err(|_| {
            Error::Encoding(format!("Expected 4 bytes for u32, got {}", bytes.len()))
        })?;
        Ok(u32::from_be_bytes(buf))
    }
}
