//! Book library: catalog and content storage.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.shelf/
//! ├── store.json        # Key-value store (catalog, preferences)
//! └── books/
//!     └── <id>.<ext>    # One materialized content file per book
//! ```
//!
//! The catalog lives under a single key of the key-value store; the content
//! store owns the `books/` directory and a session cache of decoded text.

pub mod catalog;
pub mod content;
pub mod error;
pub mod headings;
pub mod import;

pub use catalog::{CatalogStore, OpenedBook, CATALOG_KEY};
pub use content::{
    unsupported_placeholder, CacheStats, ContentCache, ContentStore, FirstByteRead, ReadabilityCheck,
};
pub use error::LibraryError;
pub use headings::{detect_headings, is_chapter_heading, Heading};
pub use import::{ImportPolicy, ImportRequest, DEFAULT_MAX_IMPORT_BYTES};
