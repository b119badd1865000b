//! Content storage for the shelf.
//!
//! Materializes imported files into the content directory and reads their
//! text back for the reader, going through a session cache keyed by path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::error::LibraryError;
use crate::domain::BookFormat;

const UTF8_BOM: char = '\u{feff}';

/// Text shown for formats whose text cannot be extracted yet
pub fn unsupported_placeholder(format: BookFormat) -> String {
    format!("Text extraction for {} files is not supported yet.", format)
}

/// Session cache of decoded text, keyed by file path.
///
/// Unbounded and never persisted; cloning shares the same entries.
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    inner: Arc<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: RwLock<HashMap<PathBuf, Arc<str>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up cached text, counting the hit or miss
    pub async fn get(&self, path: &Path) -> Option<Arc<str>> {
        let found = self.inner.entries.read().await.get(path).cloned();
        let counter = if found.is_some() {
            &self.inner.hits
        } else {
            &self.inner.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub async fn insert(&self, path: impl Into<PathBuf>, text: impl Into<Arc<str>>) {
        self.inner
            .entries
            .write()
            .await
            .insert(path.into(), text.into());
    }

    pub async fn invalidate(&self, path: &Path) -> bool {
        self.inner.entries.write().await.remove(path).is_some()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.inner.entries.read().await.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }
}

/// Decides whether a content file can actually be read back
#[async_trait]
pub trait ReadabilityCheck: Send + Sync + std::fmt::Debug {
    async fn is_readable(&self, path: &Path) -> bool;
}

/// Opens the file and reads its first byte.
///
/// Existence alone is not trusted; the one-byte read is the definitive check.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstByteRead;

#[async_trait]
impl ReadabilityCheck for FirstByteRead {
    async fn is_readable(&self, path: &Path) -> bool {
        let Ok(meta) = fs::metadata(path).await else {
            return false;
        };
        if meta.is_dir() {
            return false;
        }

        let mut file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %path.display(), "Readability check failed to open: {e}");
                return false;
            }
        };

        let mut first = [0u8; 1];
        match file.read(&mut first).await {
            Ok(_) => true,
            Err(e) => {
                debug!(path = %path.display(), "Readability check failed to read: {e}");
                false
            }
        }
    }
}

/// Owns the content directory and the text cache
#[derive(Debug, Clone)]
pub struct ContentStore {
    /// Directory holding one materialized file per book
    content_dir: PathBuf,

    cache: ContentCache,

    readability: Arc<dyn ReadabilityCheck>,
}

impl ContentStore {
    /// Create a content store rooted at `content_dir` using `cache`
    pub fn new(content_dir: impl Into<PathBuf>, cache: ContentCache) -> Self {
        Self {
            content_dir: content_dir.into(),
            cache,
            readability: Arc::new(FirstByteRead),
        }
    }

    /// Replace the readability check used after materializing
    pub fn with_readability(mut self, check: impl ReadabilityCheck + 'static) -> Self {
        self.readability = Arc::new(check);
        self
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Deterministic location for a book's content file.
    ///
    /// The id must be a single plain file name component; anything that
    /// could resolve outside the content directory is rejected.
    pub fn content_path(&self, id: &str, extension: &str) -> Result<PathBuf, LibraryError> {
        if !is_safe_file_stem(id) || !is_safe_file_stem(extension) {
            return Err(LibraryError::InvalidId(id.to_string()));
        }

        let path = self.content_dir.join(format!("{}.{}", id, extension));
        if path.parent() != Some(self.content_dir.as_path()) {
            return Err(LibraryError::InvalidId(id.to_string()));
        }
        Ok(path)
    }

    /// Ensure the content directory exists (idempotent)
    pub async fn ensure_dir(&self) -> Result<&Path, LibraryError> {
        fs::create_dir_all(&self.content_dir)
            .await
            .map_err(|source| LibraryError::ContentDir {
                path: self.content_dir.clone(),
                source,
            })?;
        Ok(&self.content_dir)
    }

    /// Check that `path` is a file whose first byte can actually be read
    pub async fn is_readable(&self, path: &Path) -> bool {
        self.readability.is_readable(path).await
    }

    /// Copy `source` to `target`.
    ///
    /// Plain text is re-encoded through a UTF-8 read/write instead of a byte
    /// copy and the decoded text is cached under `target`. If the UTF-8 read
    /// fails the file is copied byte for byte.
    pub async fn materialize(
        &self,
        source: &Path,
        target: &Path,
        mime: &str,
    ) -> Result<(), LibraryError> {
        let copy_err = |source_err| LibraryError::Materialize {
            from: source.to_path_buf(),
            to: target.to_path_buf(),
            source: source_err,
        };

        // Whatever was cached for this path belongs to an earlier copy
        self.cache.invalidate(target).await;

        if BookFormat::from_mime(mime) == Some(BookFormat::Txt) {
            match fs::read_to_string(source).await {
                Ok(text) => {
                    fs::write(target, text.as_bytes()).await.map_err(copy_err)?;
                    self.cache.insert(target, strip_bom(text)).await;
                    info!(
                        from = %source.display(),
                        to = %target.display(),
                        "Materialized text content"
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        from = %source.display(),
                        "UTF-8 read failed, falling back to byte copy: {e}"
                    );
                }
            }
        }

        fs::copy(source, target).await.map_err(copy_err)?;
        info!(
            from = %source.display(),
            to = %target.display(),
            mime,
            "Materialized content"
        );
        Ok(())
    }

    /// Read the text of `path` for display.
    ///
    /// Cached paths are served without I/O. PDF and EPUB yield a fixed
    /// placeholder, unknown types yield empty text.
    pub async fn read_text(&self, path: &Path, mime: &str) -> Result<String, LibraryError> {
        if let Some(text) = self.cache.get(path).await {
            debug!(path = %path.display(), "Content cache hit");
            return Ok(text.to_string());
        }

        let text = match BookFormat::from_mime(mime) {
            Some(BookFormat::Txt) => self.decode_text(path).await?,
            Some(format @ (BookFormat::Pdf | BookFormat::Epub)) => {
                return Ok(unsupported_placeholder(format));
            }
            None => {
                debug!(path = %path.display(), mime, "Unknown content type, no text");
                return Ok(String::new());
            }
        };

        self.cache.insert(path, text.as_str()).await;
        Ok(text)
    }

    /// Decode as UTF-8, falling back to a raw read decoded lossily
    async fn decode_text(&self, path: &Path) -> Result<String, LibraryError> {
        match fs::read_to_string(path).await {
            Ok(text) => Ok(strip_bom(text)),
            Err(e) => {
                warn!(path = %path.display(), "UTF-8 read failed, retrying as raw bytes: {e}");
                let bytes = fs::read(path)
                    .await
                    .map_err(|source| LibraryError::ContentRead {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Ok(strip_bom(String::from_utf8_lossy(&bytes).into_owned()))
            }
        }
    }

    /// Delete a content file and drop its cache entry
    pub async fn remove(&self, path: &Path) -> std::io::Result<()> {
        self.cache.invalidate(path).await;
        fs::remove_file(path).await
    }
}

/// Non-empty, not `.`/`..`, and free of path separators and NUL
fn is_safe_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains("..")
        && !name.chars().any(|c| matches!(c, '/' | '\\' | '\0'))
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> ContentStore {
        ContentStore::new(temp.path().join("books"), ContentCache::new())
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.ensure_dir().await.unwrap();
        store.ensure_dir().await.unwrap();
        assert!(store.content_dir().is_dir());
    }

    #[tokio::test]
    async fn test_is_readable_rejects_directories_and_missing() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store.ensure_dir().await.unwrap();

        assert!(!store.is_readable(store.content_dir()).await);
        assert!(!store.is_readable(&temp.path().join("missing.txt")).await);

        let file = temp.path().join("empty.txt");
        std::fs::write(&file, b"").unwrap();
        assert!(store.is_readable(&file).await);
    }

    #[tokio::test]
    async fn test_materialize_text_populates_cache() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store.ensure_dir().await.unwrap();

        let source = temp.path().join("source.txt");
        std::fs::write(&source, "第一章\n正文").unwrap();
        let target = store.content_path("b1", "txt").unwrap();

        store.materialize(&source, &target, "text/plain").await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "第一章\n正文");
        assert_eq!(store.cache().stats().await.entries, 1);
    }

    #[tokio::test]
    async fn test_materialize_invalid_utf8_falls_back_to_byte_copy() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store.ensure_dir().await.unwrap();

        let source = temp.path().join("latin1.txt");
        let bytes = [b'c', b'a', b'f', 0xE9];
        std::fs::write(&source, bytes).unwrap();
        let target = store.content_path("b2", "txt").unwrap();

        store.materialize(&source, &target, "text/plain").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), bytes);
        assert_eq!(store.cache().stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_byte_copy_replaces_stale_cached_text() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store.ensure_dir().await.unwrap();

        let target = store.content_path("b3", "txt").unwrap();
        std::fs::write(&target, "OLD TEXT").unwrap();
        store.cache().insert(&target, "OLD TEXT").await;

        let source = temp.path().join("new.txt");
        std::fs::write(&source, [b'n', b'e', b'w', 0xE9]).unwrap();
        store.materialize(&source, &target, "text/plain").await.unwrap();

        let text = store.read_text(&target, "text/plain").await.unwrap();
        assert_eq!(text, "new\u{FFFD}");
    }

    #[test]
    fn test_content_path_stays_inside_content_dir() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        assert_eq!(
            store.content_path("b1", "epub").unwrap(),
            temp.path().join("books").join("b1.epub")
        );
        for id in ["", ".", "..", "../up", "a/b", "a\\b", "nul\0id"] {
            assert!(
                matches!(store.content_path(id, "txt"), Err(LibraryError::InvalidId(_))),
                "id {id:?} was accepted"
            );
        }
    }

    #[tokio::test]
    async fn test_read_text_decodes_lossily_after_utf8_failure() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let path = temp.path().join("mixed.txt");
        std::fs::write(&path, [b'o', b'k', 0xFF]).unwrap();

        let text = store.read_text(&path, "text/plain").await.unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_read_text_strips_bom() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let path = temp.path().join("bom.txt");
        std::fs::write(&path, "\u{feff}CHAPTER ONE").unwrap();

        let text = store.read_text(&path, "text/plain").await.unwrap();
        assert_eq!(text, "CHAPTER ONE");
    }

    #[tokio::test]
    async fn test_read_text_unknown_type_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let text = store
            .read_text(&temp.path().join("nope.bin"), "application/octet-stream")
            .await
            .unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_read_text_missing_file_is_content_read_error() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let result = store
            .read_text(&temp.path().join("gone.txt"), "text/plain")
            .await;
        assert!(matches!(result, Err(LibraryError::ContentRead { .. })));
    }

    #[tokio::test]
    async fn test_remove_invalidates_cache() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let path = temp.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        store.read_text(&path, "text/plain").await.unwrap();
        assert_eq!(store.cache().stats().await.entries, 1);

        store.remove(&path).await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.cache().stats().await.entries, 0);
    }
}
