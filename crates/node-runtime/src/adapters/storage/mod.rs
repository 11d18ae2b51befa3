//! # Storage Adapters
//!
//! The node keeps every subsystem's records in one key-value store.
//!
//! ## Usage
//!
//! Enable the `rocksdb` feature and set `PC_DATA_DIR` to persist across
//! restarts:
//!
//! ```toml
//! node-runtime = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! Without either, state lives in an [`InMemoryKVStore`] and is lost on exit.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

use crate::container::config::StorageConfig;
use shared_types::storage::{BatchOperation, InMemoryKVStore, KeyValueStore};
use shared_types::KVStoreError;
use tracing::info;

/// The store backing the canvas and the ledger.
pub enum NodeStore {
    Memory(InMemoryKVStore),
    #[cfg(feature = "rocksdb")]
    RocksDb(RocksDbStore),
}

impl NodeStore {
    /// Open the backend selected by `config`.
    pub fn open(config: &StorageConfig) -> Result<Self, KVStoreError> {
        match &config.data_dir {
            #[cfg(feature = "rocksdb")]
            Some(path) => {
                info!(path = %path.display(), "Opening RocksDB store");
                RocksDbStore::open_default(path).map(NodeStore::RocksDb)
            }
            #[cfg(not(feature = "rocksdb"))]
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "Data directory set but built without the rocksdb feature, keeping state in memory"
                );
                Ok(NodeStore::in_memory())
            }
            None => {
                info!("Keeping state in memory");
                Ok(NodeStore::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        NodeStore::Memory(InMemoryKVStore::new())
    }

    pub fn backend(&self) -> &'static str {
        match self {
            NodeStore::Memory(_) => "memory",
            #[cfg(feature = "rocksdb")]
            NodeStore::RocksDb(_) => "rocksdb",
        }
    }

    fn inner(&self) -> &dyn KeyValueStore {
        match self {
            NodeStore::Memory(store) => store,
            #[cfg(feature = "rocksdb")]
            NodeStore::RocksDb(store) => store,
        }
    }
}

impl KeyValueStore for NodeStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.inner().get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.inner().put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.inner().delete(key)
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        self.inner().atomic_batch_write(operations)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        self.inner().exists(key)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        self.inner().prefix_scan(prefix)
    }
}
