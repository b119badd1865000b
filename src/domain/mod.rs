//! Domain types for the shelf.
//!
//! This module contains the core data structures:
//! - BookRecord: Catalog entry with reading position and annotations
//! - BookFormat: Supported document formats and their MIME mapping

pub mod book;
pub mod format;

// Re-export commonly used types
pub use book::{BookRecord, Bookmark, Highlight, ReadingProgress};
pub use format::{target_extension, BookFormat};
