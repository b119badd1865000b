//! Supported book formats and their MIME/extension mapping.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Document format of an imported book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookFormat {
    /// EPUB container (`application/epub+zip`)
    Epub,

    /// Plain text (`text/plain`)
    Txt,

    /// PDF document (`application/pdf`)
    Pdf,
}

impl BookFormat {
    /// Every format the shelf knows about
    pub const ALL: [BookFormat; 3] = [BookFormat::Epub, BookFormat::Txt, BookFormat::Pdf];

    /// Resolve a format from a declared MIME type.
    ///
    /// Parameters such as `; charset=utf-8` are ignored and matching is
    /// case-insensitive. Returns `None` for anything unrecognized.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();

        match essence.to_ascii_lowercase().as_str() {
            "application/epub+zip" | "application/epub" => Some(BookFormat::Epub),
            "text/plain" => Some(BookFormat::Txt),
            "application/pdf" => Some(BookFormat::Pdf),
            _ => None,
        }
    }

    /// Resolve a format from a file extension (without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "epub" => Some(BookFormat::Epub),
            "txt" | "text" => Some(BookFormat::Txt),
            "pdf" => Some(BookFormat::Pdf),
            _ => None,
        }
    }

    /// Canonical MIME type
    pub fn mime(&self) -> &'static str {
        match self {
            BookFormat::Epub => "application/epub+zip",
            BookFormat::Txt => "text/plain",
            BookFormat::Pdf => "application/pdf",
        }
    }

    /// Extension used for materialized content files
    pub fn extension(&self) -> &'static str {
        match self {
            BookFormat::Epub => "epub",
            BookFormat::Txt => "txt",
            BookFormat::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for BookFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookFormat::Epub => write!(f, "EPUB"),
            BookFormat::Txt => write!(f, "TXT"),
            BookFormat::Pdf => write!(f, "PDF"),
        }
    }
}

impl std::str::FromStr for BookFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::from_mime(s)
            .or_else(|| Self::from_extension(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown book format: {}", s))
    }
}

/// Pick the extension for a materialized file.
///
/// The declared MIME type wins; otherwise the source path's own extension is
/// used (lowercased), and `bin` when the source has none.
pub fn target_extension(mime: &str, source: &Path) -> String {
    if let Some(format) = BookFormat::from_mime(mime) {
        return format.extension().to_string();
    }

    source
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}
