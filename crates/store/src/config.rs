//! Storage configuration

use std::path::PathBuf;

/// Default upper bound on key length in bytes
pub const DEFAULT_MAX_KEY_LEN: usize = 1024;

/// Configuration for the ledger store
#[derive(Clone)]
pub struct StorageConfig {
    /// Directory for storage data
    pub data_dir: PathBuf,

    /// Block cache size for Fjall (in bytes)
    pub block_cache_size: u64,

    /// Compression type for data
    pub compression: fjall::CompressionType,

    /// Persist mode applied after every commit
    pub persist_mode: fjall::PersistMode,

    /// Replica-unique seed for transaction id generation
    pub replica_seed: u64,

    /// Longest accepted key, in bytes
    pub max_key_len: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Using .keep() to persist the directory (won't be auto-deleted)
        let temp_dir = tempfile::tempdir()
            .map(|dir| dir.keep())
            .unwrap_or_else(|_| std::env::temp_dir().join("ledger-store"));

        Self::new(temp_dir)
    }
}

impl StorageConfig {
    /// Create a new config with the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            block_cache_size: 64 * 1024 * 1024, // 64 MB
            compression: fjall::CompressionType::Lz4,
            persist_mode: fjall::PersistMode::Buffer,
            replica_seed: 0,
            max_key_len: DEFAULT_MAX_KEY_LEN,
        }
    }

    /// Set block cache size
    pub fn with_block_cache_size(mut self, size: u64) -> Self {
        self.block_cache_size = size;
        self
    }

    /// Set compression type
    pub fn with_compression(mut self, compression: fjall::CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Set persist mode
    pub fn with_persist_mode(mut self, mode: fjall::PersistMode) -> Self {
        self.persist_mode = mode;
        self
    }

    /// Set the replica seed used for transaction ids
    pub fn with_replica_seed(mut self, seed: u64) -> Self {
        self.replica_seed = seed;
        self
    }

    /// Set the maximum key length
    pub fn with_max_key_len(mut self, len: usize) -> Self {
        self.max_key_len = len;
        self
    }
}
