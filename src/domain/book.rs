//! Book metadata records as stored in the catalog.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::format::BookFormat;

/// One imported book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    /// Unique identifier within the catalog (caller-assigned)
    pub id: String,

    /// Display title
    pub title: String,

    /// Display author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Location of the materialized content file
    pub file_path: PathBuf,

    /// MIME-like type used to pick the text extraction strategy
    pub file_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,

    /// When the book was last opened for reading
    pub last_read: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_page: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_index: Option<usize>,

    #[serde(default)]
    pub highlights: Vec<Highlight>,

    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

impl BookRecord {
    /// Create a new record pointing at `file_path`
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        file_path: impl Into<PathBuf>,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            file_path: file_path.into(),
            file_type: file_type.into(),
            cover_url: None,
            last_read: Utc::now(),
            last_page: None,
            total_pages: None,
            chapter_index: None,
            highlights: Vec::new(),
            bookmarks: Vec::new(),
        }
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the cover URL
    pub fn with_cover_url(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = Some(cover_url.into());
        self
    }

    /// Format resolved from `file_type`, if recognized
    pub fn format(&self) -> Option<BookFormat> {
        BookFormat::from_mime(&self.file_type)
    }

    /// Apply a reading position update
    pub fn apply_progress(&mut self, progress: ReadingProgress) {
        self.last_page = Some(progress.last_page);
        if let Some(total) = progress.total_pages {
            self.total_pages = Some(total);
        }
        if let Some(chapter) = progress.chapter_index {
            self.chapter_index = Some(chapter);
        }
    }
}

/// Reading position reported by the reader view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub last_page: usize,
    pub total_pages: Option<usize>,
    pub chapter_index: Option<usize>,
}

/// A highlighted span of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,

    /// Line index into the book's text
    pub position: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<usize>,

    /// The highlighted text itself
    pub text: String,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Highlight {
    /// Create a highlight with a fresh id
    pub fn new(position: usize, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            position,
            chapter: None,
            text: text.into(),
            created_at: Utc::now(),
            note: None,
        }
    }

    pub fn with_chapter(mut self, chapter: usize) -> Self {
        self.chapter = Some(chapter);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A saved reading position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,

    /// Line index into the book's text
    pub position: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<usize>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Bookmark {
    /// Create a bookmark with a fresh id
    pub fn new(position: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            position,
            chapter: None,
            created_at: Utc::now(),
            note: None,
        }
    }

    pub fn with_chapter(mut self, chapter: usize) -> Self {
        self.chapter = Some(chapter);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
