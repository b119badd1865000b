//! Acceptance rules for files picked for import.
//!
//! Checks run before anything is written: a rejected request leaves the
//! content directory and the catalog untouched.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::error::LibraryError;
use crate::domain::BookFormat;

/// Default upper bound on imported file size (50 MiB)
pub const DEFAULT_MAX_IMPORT_BYTES: u64 = 50 * 1024 * 1024;

/// A file chosen by the user for import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Where the picked file currently lives (may be ephemeral)
    pub source: PathBuf,

    /// MIME type declared by the picker
    pub mime_type: String,

    /// Display file name
    pub name: String,

    /// Title to use instead of the one derived from `name`
    pub title: Option<String>,

    pub author: Option<String>,
}

impl ImportRequest {
    pub fn new(
        source: impl Into<PathBuf>,
        mime_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            mime_type: mime_type.into(),
            name: name.into(),
            title: None,
            author: None,
        }
    }

    /// Build a request for a local path, deriving the MIME type from the
    /// extension when none is declared
    pub fn from_path(source: impl Into<PathBuf>, mime_type: Option<String>) -> Self {
        let source = source.into();
        let name = source
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let mime_type = mime_type.unwrap_or_else(|| {
            source
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(BookFormat::from_extension)
                .map(|format| format.mime().to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string())
        });

        Self {
            source,
            mime_type,
            name,
            title: None,
            author: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Title to record: the explicit one if set, else the file name
    /// without its extension
    pub fn title(&self) -> String {
        if let Some(title) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return title.to_string();
        }

        let stem = Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().trim().to_string())
            .unwrap_or_default();

        if stem.is_empty() {
            self.name.clone()
        } else {
            stem
        }
    }
}

/// Which files may be imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPolicy {
    /// Largest accepted file, in bytes
    pub max_size_bytes: u64,

    /// Declared formats that are accepted
    pub accepted: Vec<BookFormat>,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_IMPORT_BYTES,
            accepted: BookFormat::ALL.to_vec(),
        }
    }
}

impl ImportPolicy {
    /// Validate a request without touching the filesystem beyond a stat.
    ///
    /// Returns the resolved format on success.
    pub async fn check(&self, request: &ImportRequest) -> Result<BookFormat, LibraryError> {
        let format = BookFormat::from_mime(&request.mime_type)
            .filter(|format| self.accepted.contains(format))
            .ok_or_else(|| LibraryError::UnsupportedType(request.mime_type.clone()))?;

        let meta = fs::metadata(&request.source)
            .await
            .map_err(|source| LibraryError::ContentRead {
                path: request.source.clone(),
                source,
            })?;

        if meta.is_dir() {
            return Err(LibraryError::FileNotReadable(request.source.clone()));
        }

        if meta.len() > self.max_size_bytes {
            return Err(LibraryError::FileTooLarge {
                size: meta.len(),
                limit: self.max_size_bytes,
            });
        }

        debug!(
            source = %request.source.display(),
            %format,
            size = meta.len(),
            "Import request accepted"
        );
        Ok(format)
    }
}
