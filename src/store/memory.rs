//! In-memory key-value store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, StoreError};

/// Key-value store backed by a `HashMap`.
///
/// Writes can be switched to fail with [`MemoryStore::fail_writes`], which lets
/// tests exercise persist failures without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with values
    pub fn with_values(values: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        let map = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        Self {
            values: RwLock::new(map),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `set`/`remove` fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.values.write().await.remove(key);
        Ok(())
    }
}
