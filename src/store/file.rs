//! File-backed key-value store.
//!
//! All keys live in a single JSON object file. Every write replaces the whole
//! file through a temp file + rename, so readers only ever see a complete
//! snapshot.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{KeyValueStore, StoreError};

type Entries = BTreeMap<String, String>;

/// Key-value store persisted as one JSON object file
#[derive(Debug)]
pub struct JsonFileStore {
    /// Path to the JSON file
    path: PathBuf,

    /// Serializes writers within this process
    write_guard: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store for `path` (the file is created on first write)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_guard: Mutex::new(()),
        }
    }

    /// Open a store, creating its parent directory if needed
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(path);
        fs::create_dir_all(store.parent_dir()).await?;
        Ok(store)
    }

    /// Path to the backing JSON file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Load all entries (missing file means empty)
    async fn load(&self) -> Result<Entries, StoreError> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            StoreError::Corrupt(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Load entries for a write; a corrupt file is moved aside so the store
    /// can keep accepting writes.
    async fn load_for_write(&self) -> Result<Entries, StoreError> {
        match self.load().await {
            Err(StoreError::Corrupt(reason)) => {
                let aside = self.path.with_extension("json.corrupt");
                warn!(
                    path = %self.path.display(),
                    aside = %aside.display(),
                    "Store file is corrupt, starting fresh: {reason}"
                );
                fs::rename(&self.path, &aside).await?;
                Ok(Entries::new())
            }
            other => other,
        }
    }

    /// Atomically replace the backing file with `entries`
    async fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)?;
        let path = self.path.clone();
        let dir = self.parent_dir();

        tokio::task::spawn_blocking(move || write_atomic(&path, &dir, &content))
            .await
            .map_err(|e| StoreError::Unavailable(format!("write task failed: {e}")))??;

        debug!(path = %self.path.display(), keys = entries.len(), "Store persisted");
        Ok(())
    }
}

/// Write `content` to `path` via a temp file in `dir`, holding an advisory
/// lock on a sidecar `.lock` file so other processes do not interleave.
fn write_atomic(path: &Path, dir: &Path, content: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;

    let lock_path = path.with_extension("lock");
    let lock = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)?;
    FileExt::lock_exclusive(&lock)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    // Lock is released when `lock` is dropped
    Ok(())
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.load().await?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_guard.lock().await;

        let mut entries = self.load_for_write().await?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_guard.lock().await;

        let mut entries = self.load_for_write().await?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.set("shelf.books", "[]").await.unwrap();
        store.set("shelf.language", "en").await.unwrap();
        drop(store);

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("shelf.language").await.unwrap(),
            Some("en".to_string())
        );
        assert_eq!(
            reopened.get("shelf.books").await.unwrap(),
            Some("[]".to_string())
        );
        assert_eq!(reopened.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path().join("store.json"));
        assert_eq!(store.get("anything").await.unwrap(), None);

        // Removing from a missing file does not create it
        store.remove("anything").await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_reports_then_recovers_on_write() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("k").await, Err(StoreError::Corrupt(_))));

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        assert!(temp.path().join("store.json.corrupt").exists());
    }

    #[tokio::test]
    async fn test_concurrent_writers_keep_all_keys() {
        let temp = TempDir::new().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::new(temp.path().join("store.json")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set(&format!("key{i}"), &i.to_string()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..8 {
            assert_eq!(
                store.get(&format!("key{i}")).await.unwrap(),
                Some(i.to_string())
            );
        }
    }
}
