//! shelf - Local e-book shelf
//!
//! Imports document files (EPUB, TXT, PDF) into an app-private directory,
//! keeps their metadata in a key-value store, and reads plain text back for
//! display with a best-effort table of contents.
//!
//! # Architecture
//!
//! - The catalog is one JSON array under a single key; every change is a
//!   full load-modify-save done under the catalog's write lock
//! - Content files are materialized as `<id>.<ext>` and decoded text is
//!   kept in an injected session cache
//! - Chapter headings are guessed line by line from plain text
//!
//! # Modules
//!
//! - `domain`: Data structures (BookRecord, Bookmark, Highlight, BookFormat)
//! - `library`: Catalog store, content store, heading heuristic, import rules
//! - `store`: Key-value persistence (JSON file, in-memory)
//! - `preferences`: Language and reader display settings
//! - `config`: Path and import-limit configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Import a book
//! shelf import ~/Downloads/novel.txt
//!
//! # Show its table of contents
//! shelf toc <book-id>
//!
//! # Read from line 120
//! shelf read <book-id> --from 120
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod library;
pub mod preferences;
pub mod store;

// Re-export main types at crate root for convenience
pub use domain::{BookFormat, BookRecord, Bookmark, Highlight, ReadingProgress};
pub use library::{
    detect_headings, is_chapter_heading, CatalogStore, ContentCache, ContentStore, Heading,
    ImportPolicy, ImportRequest, LibraryError, OpenedBook, ReadabilityCheck,
};
pub use preferences::{Language, Preferences, ReaderSettings, Theme};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
