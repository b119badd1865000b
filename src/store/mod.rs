//! Key-value persistence for catalog and preferences.
//!
//! The shelf keeps all metadata as string values under a handful of fixed
//! keys. Two implementations are provided:
//! - `JsonFileStore`: one JSON object on disk, replaced atomically on write
//! - `MemoryStore`: in-process map for tests and ephemeral sessions

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Errors that can occur in a key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store file is corrupt: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous string key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key` (no-op if absent)
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
