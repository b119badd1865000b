//! Catalog Integration Tests
//!
//! Tests for the add/get/update/delete lifecycle against a real content
//! directory and both key-value store implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shelf::library::CATALOG_KEY;
use shelf::{
    BookRecord, CatalogStore, ContentCache, ContentStore, JsonFileStore, KeyValueStore,
    LibraryError, MemoryStore,
};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn content_store(temp: &TempDir) -> ContentStore {
    ContentStore::new(temp.path().join("books"), ContentCache::new())
}

fn memory_catalog(temp: &TempDir) -> CatalogStore {
    CatalogStore::new(Arc::new(MemoryStore::new()), content_store(temp))
}

fn write_source(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let catalog = memory_catalog(&temp);

    assert_ok!(catalog.initialize().await);
    assert_ok!(catalog.initialize().await);
    assert!(temp.path().join("books").is_dir());
}

#[tokio::test]
async fn test_add_then_get_points_at_readable_copy() {
    let temp = TempDir::new().unwrap();
    let catalog = memory_catalog(&temp);
    let picker = temp.path().join("picker");
    std::fs::create_dir_all(&picker).unwrap();

    let cases = [
        ("t1", "novel.txt", "text/plain"),
        ("p1", "paper.pdf", "application/pdf"),
        ("e1", "story.epub", "application/epub+zip"),
    ];

    for (id, name, mime) in cases {
        let source = write_source(&picker, name, "content bytes");
        let record = BookRecord::new(id, name, &source, mime);
        assert_ok!(catalog.add_book(record, &source).await);

        let stored = catalog.get_book(id).await.expect("book should exist");
        assert_ne!(stored.file_path, source);
        assert!(stored.file_path.starts_with(temp.path().join("books")));
        assert!(catalog.content().is_readable(&stored.file_path).await);
    }
}

#[tokio::test]
async fn test_n_adds_yield_n_records_in_order() {
    let temp = TempDir::new().unwrap();
    let catalog = memory_catalog(&temp);
    let source = write_source(temp.path(), "src.txt", "hello");

    for i in 0..5 {
        let record = BookRecord::new(format!("book-{i}"), format!("Book {i}"), &source, "text/plain");
        assert_ok!(catalog.add_book(record, &source).await);
    }

    let books = catalog.get_all_books().await;
    assert_eq!(books.len(), 5);
    for (i, book) in books.iter().enumerate() {
        assert_eq!(book.id, format!("book-{i}"));
        assert!(catalog.get_book(&book.id).await.is_some());
    }
}

#[tokio::test]
async fn test_delete_removes_record_and_file() {
    let temp = TempDir::new().unwrap();
    let catalog = memory_catalog(&temp);
    let source = write_source(temp.path(), "src.txt", "hello");

    let added = assert_ok!(
        catalog
            .add_book(BookRecord::new("b1", "B", &source, "text/plain"), &source)
            .await
    );
    assert!(added.file_path.exists());

    assert_ok!(catalog.delete_book("b1").await);

    assert!(catalog.get_book("b1").await.is_none());
    assert!(!added.file_path.exists());
    // Source is never touched
    assert!(source.exists());
}

#[tokio::test]
async fn test_update_unknown_id_leaves_catalog_unchanged() {
    let temp = TempDir::new().unwrap();
    let catalog = memory_catalog(&temp);
    let source = write_source(temp.path(), "src.txt", "hello");
    assert_ok!(
        catalog
            .add_book(BookRecord::new("b1", "B", &source, "text/plain"), &source)
            .await
    );

    let before = catalog.get_all_books().await;
    let stranger = BookRecord::new("nobody", "X", "/nowhere.txt", "text/plain");
    let err = assert_err!(catalog.update_book(stranger).await);
    assert!(matches!(err, LibraryError::RecordNotFound(id) if id == "nobody"));

    assert_eq!(catalog.get_all_books().await, before);
}

#[tokio::test]
async fn test_save_books_propagates_write_failure() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let catalog = CatalogStore::new(store.clone(), content_store(&temp));

    store.fail_writes(true);
    let err = assert_err!(catalog.save_books(&[]).await);
    assert!(matches!(err, LibraryError::StorageWrite(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_get_book_does_not_check_readability() {
    let temp = TempDir::new().unwrap();
    let catalog = memory_catalog(&temp);
    let source = write_source(temp.path(), "src.txt", "hello");

    let added = assert_ok!(
        catalog
            .add_book(BookRecord::new("b1", "B", &source, "text/plain"), &source)
            .await
    );
    std::fs::remove_file(&added.file_path).unwrap();

    let book = catalog.get_book("b1").await.expect("record still listed");
    assert!(!catalog.content().is_readable(&book.file_path).await);
}

#[tokio::test]
async fn test_catalog_persists_across_instances() {
    let temp = TempDir::new().unwrap();
    let store_path = temp.path().join("state").join("store.json");
    let source = write_source(temp.path(), "src.txt", "hello");

    {
        let store = Arc::new(JsonFileStore::open(&store_path).await.unwrap());
        let catalog = CatalogStore::new(store, content_store(&temp));
        assert_ok!(
            catalog
                .add_book(
                    BookRecord::new("b1", "Kept", &source, "text/plain").with_author("A. Writer"),
                    &source,
                )
                .await
        );
    }

    let store = Arc::new(JsonFileStore::new(&store_path));
    let catalog = CatalogStore::new(store.clone(), content_store(&temp));
    let book = catalog.get_book("b1").await.expect("persisted");
    assert_eq!(book.title, "Kept");
    assert_eq!(book.author.as_deref(), Some("A. Writer"));

    // Stored as a JSON array with camelCase fields
    let raw = store.get(CATALOG_KEY).await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value.is_array());
    assert_eq!(value[0]["fileType"], "text/plain");
}

#[tokio::test]
async fn test_concurrent_adds_are_all_kept() {
    let temp = TempDir::new().unwrap();
    let catalog = Arc::new(memory_catalog(&temp));
    let source = write_source(temp.path(), "src.txt", "hello");

    let mut handles = Vec::new();
    for i in 0..10 {
        let catalog = catalog.clone();
        let source = source.clone();
        handles.push(tokio::spawn(async move {
            let record = BookRecord::new(format!("c{i}"), "C", &source, "text/plain");
            catalog.add_book(record, &source).await
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    assert_eq!(catalog.get_all_books().await.len(), 10);
}
