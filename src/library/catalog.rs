//! Catalog of all imported books.
//!
//! The whole collection is stored as one JSON array under [`CATALOG_KEY`].
//! Every mutation is a load-modify-save of the full array, performed while
//! holding the catalog's write lock, so concurrent callers never interleave.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::content::ContentStore;
use super::error::LibraryError;
use super::headings::{detect_headings, Heading};
use super::import::{ImportPolicy, ImportRequest};
use crate::domain::{target_extension, BookFormat, BookRecord, Bookmark, Highlight, ReadingProgress};
use crate::store::KeyValueStore;

/// Key holding the serialized catalog
pub const CATALOG_KEY: &str = "shelf.books";

/// A book loaded for the reader
#[derive(Debug, Clone)]
pub struct OpenedBook {
    pub record: BookRecord,

    /// Decoded text (or a placeholder for unsupported formats)
    pub text: String,

    /// Detected headings (plain text only)
    pub headings: Vec<Heading>,
}

/// Durable registry of book metadata
pub struct CatalogStore {
    store: Arc<dyn KeyValueStore>,
    content: ContentStore,

    /// Held for the duration of every load-modify-save
    write_lock: Mutex<()>,
}

impl CatalogStore {
    /// Create a catalog over `store`, materializing files through `content`
    pub fn new(store: Arc<dyn KeyValueStore>, content: ContentStore) -> Self {
        Self {
            store,
            content,
            write_lock: Mutex::new(()),
        }
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Ensure the content directory exists
    pub async fn initialize(&self) -> Result<(), LibraryError> {
        let dir = self.content.ensure_dir().await?;
        debug!(dir = %dir.display(), "Catalog initialized");
        Ok(())
    }

    /// Load the persisted collection, surfacing read and parse failures
    async fn load_books(&self) -> Result<Vec<BookRecord>, LibraryError> {
        let Some(raw) = self
            .store
            .get(CATALOG_KEY)
            .await
            .map_err(LibraryError::StorageRead)?
        else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&raw).map_err(|e| LibraryError::StorageRead(e.into()))
    }

    /// All books in insertion order.
    ///
    /// An unreadable or corrupt catalog is logged and treated as empty.
    pub async fn get_all_books(&self) -> Vec<BookRecord> {
        match self.load_books().await {
            Ok(books) => books,
            Err(e) => {
                warn!("Treating catalog as empty: {e}");
                Vec::new()
            }
        }
    }

    /// Replace the entire persisted collection
    pub async fn save_books(&self, records: &[BookRecord]) -> Result<(), LibraryError> {
        let _guard = self.write_lock.lock().await;
        self.persist(records).await
    }

    /// Write the collection; callers must hold the write lock
    async fn persist(&self, records: &[BookRecord]) -> Result<(), LibraryError> {
        let json = serde_json::to_string(records)
            .map_err(|e| LibraryError::StorageWrite(e.into()))?;

        self.store
            .set(CATALOG_KEY, &json)
            .await
            .map_err(LibraryError::StorageWrite)?;

        debug!(count = records.len(), "Catalog saved");
        Ok(())
    }

    /// Materialize `source` into the content directory and register `record`.
    ///
    /// The stored record's `file_path` points at the materialized copy. If
    /// the copy fails nothing is persisted; if persisting fails after a
    /// successful copy, the copied file is left in place.
    pub async fn add_book(
        &self,
        mut record: BookRecord,
        source: &Path,
    ) -> Result<BookRecord, LibraryError> {
        let _guard = self.write_lock.lock().await;

        let mut books = self.get_all_books().await;
        if books.iter().any(|b| b.id == record.id) {
            return Err(LibraryError::DuplicateId(record.id));
        }

        let extension = target_extension(&record.file_type, source);
        let target = self.content.content_path(&record.id, &extension)?;

        self.content.ensure_dir().await?;

        self.content
            .materialize(source, &target, &record.file_type)
            .await?;

        if !self.content.is_readable(&target).await {
            return Err(LibraryError::FileNotReadable(target));
        }

        record.file_path = target;
        books.push(record.clone());

        if let Err(e) = self.persist(&books).await {
            warn!(
                id = %record.id,
                path = %record.file_path.display(),
                "Catalog save failed after copy, content file left in place"
            );
            return Err(e);
        }

        info!(
            id = %record.id,
            title = %record.title,
            path = %record.file_path.display(),
            "Book added"
        );
        Ok(record)
    }

    /// Validate a picked file and add it as a new book with a fresh id
    pub async fn import(
        &self,
        request: &ImportRequest,
        policy: &ImportPolicy,
    ) -> Result<BookRecord, LibraryError> {
        let format = policy.check(request).await?;

        let mut record = BookRecord::new(
            Uuid::new_v4().to_string(),
            request.title(),
            &request.source,
            format.mime(),
        );
        record.author = request.author.clone();

        self.add_book(record, &request.source).await
    }

    /// Look up a book by id.
    ///
    /// The backing file is not checked here; read failures surface when the
    /// text is fetched.
    pub async fn get_book(&self, id: &str) -> Option<BookRecord> {
        self.get_all_books().await.into_iter().find(|b| b.id == id)
    }

    /// Replace the record with the same id
    pub async fn update_book(&self, record: BookRecord) -> Result<(), LibraryError> {
        let _guard = self.write_lock.lock().await;

        let mut books = self.get_all_books().await;
        let existing = books
            .iter_mut()
            .find(|b| b.id == record.id)
            .ok_or_else(|| LibraryError::RecordNotFound(record.id.clone()))?;

        *existing = record;
        self.persist(&books).await
    }

    /// Remove a book and, best-effort, its content file.
    ///
    /// Returns the removed record, or `None` if no book had that id.
    pub async fn delete_book(&self, id: &str) -> Result<Option<BookRecord>, LibraryError> {
        let _guard = self.write_lock.lock().await;

        let mut books = self.get_all_books().await;
        let Some(pos) = books.iter().position(|b| b.id == id) else {
            debug!(id, "Delete requested for unknown book");
            return Ok(None);
        };

        let removed = books.remove(pos);
        self.persist(&books).await?;

        if let Err(e) = self.content.remove(&removed.file_path).await {
            warn!(
                id,
                path = %removed.file_path.display(),
                "Failed to delete content file: {e}"
            );
        }

        info!(id, title = %removed.title, "Book deleted");
        Ok(Some(removed))
    }

    /// Load a book's text for reading.
    ///
    /// On success `last_read` is bumped; failing to save that timestamp is
    /// logged and does not fail the read.
    pub async fn open_book(&self, id: &str) -> Result<OpenedBook, LibraryError> {
        let record = self
            .get_book(id)
            .await
            .ok_or_else(|| LibraryError::RecordNotFound(id.to_string()))?;

        let text = self
            .content
            .read_text(&record.file_path, &record.file_type)
            .await?;

        let headings = match record.format() {
            Some(BookFormat::Txt) => detect_headings(&text),
            _ => Vec::new(),
        };

        let record = match self.modify(id, |book| book.last_read = Utc::now()).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(id, "Failed to update last read time: {e}");
                record
            }
        };

        Ok(OpenedBook {
            record,
            text,
            headings,
        })
    }

    /// Store the reader's current position
    pub async fn record_progress(
        &self,
        id: &str,
        progress: ReadingProgress,
    ) -> Result<BookRecord, LibraryError> {
        self.modify(id, |book| book.apply_progress(progress)).await
    }

    pub async fn add_bookmark(
        &self,
        id: &str,
        bookmark: Bookmark,
    ) -> Result<BookRecord, LibraryError> {
        self.modify(id, |book| book.bookmarks.push(bookmark)).await
    }

    /// Remove a bookmark by its id (unknown bookmark ids are ignored)
    pub async fn remove_bookmark(
        &self,
        id: &str,
        bookmark_id: &str,
    ) -> Result<BookRecord, LibraryError> {
        self.modify(id, |book| book.bookmarks.retain(|b| b.id != bookmark_id))
            .await
    }

    pub async fn add_highlight(
        &self,
        id: &str,
        highlight: Highlight,
    ) -> Result<BookRecord, LibraryError> {
        self.modify(id, |book| book.highlights.push(highlight)).await
    }

    /// Remove a highlight by its id (unknown highlight ids are ignored)
    pub async fn remove_highlight(
        &self,
        id: &str,
        highlight_id: &str,
    ) -> Result<BookRecord, LibraryError> {
        self.modify(id, |book| book.highlights.retain(|h| h.id != highlight_id))
            .await
    }

    /// Apply `change` to one record under the write lock and persist
    async fn modify<F>(&self, id: &str, change: F) -> Result<BookRecord, LibraryError>
    where
        F: FnOnce(&mut BookRecord),
    {
        let _guard = self.write_lock.lock().await;

        let mut books = self.get_all_books().await;
        let book = books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| LibraryError::RecordNotFound(id.to_string()))?;

        change(book);
        let updated = book.clone();

        self.persist(&books).await?;
        Ok(updated)
    }
}
