//! Errors surfaced by the catalog and content stores.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while managing the shelf
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Persisted catalog could not be read or parsed
    #[error("Failed to read catalog: {0}")]
    StorageRead(#[source] StoreError),

    /// Persisting the catalog failed
    #[error("Failed to save catalog: {0}")]
    StorageWrite(#[source] StoreError),

    /// Materialized file failed the readability check
    #[error("File is not readable: {}", .0.display())]
    FileNotReadable(PathBuf),

    /// Text could not be read through any fallback
    #[error("Failed to read content from {}: {source}", path.display())]
    ContentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content directory could not be created
    #[error("Failed to create content directory {}: {source}", path.display())]
    ContentDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying an imported file into the content directory failed
    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Materialize {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Book not found: {0}")]
    RecordNotFound(String),

    #[error("Book already exists: {0}")]
    DuplicateId(String),

    /// Id cannot be used as a content file name
    #[error("Invalid book id: {0:?}")]
    InvalidId(String),

    /// Declared file type is not accepted for import
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File too large: {size} bytes (limit: {limit})")]
    FileTooLarge { size: u64, limit: u64 },
}

impl LibraryError {
    /// Returns `true` if the user may retry the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ContentRead { .. } | Self::StorageWrite(_) | Self::Materialize { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let read = LibraryError::ContentRead {
            path: PathBuf::from("/b.txt"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(read.is_retryable());
        assert!(LibraryError::StorageWrite(StoreError::Unavailable("x".into())).is_retryable());

        assert!(!LibraryError::RecordNotFound("b".into()).is_retryable());
        assert!(!LibraryError::UnsupportedType("image/png".into()).is_retryable());
        assert!(!LibraryError::InvalidId("../x".into()).is_retryable());
    }

    #[test]
    fn test_messages_name_the_subject() {
        let err = LibraryError::FileTooLarge {
            size: 60,
            limit: 50,
        };
        assert_eq!(err.to_string(), "File too large: 60 bytes (limit: 50)");

        let err = LibraryError::FileNotReadable(PathBuf::from("/books/a.txt"));
        assert!(err.to_string().contains("/books/a.txt"));
    }
}
