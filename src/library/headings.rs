//! Best-effort table of contents for plain text.
//!
//! A line counts as a chapter heading when it is short and either has no
//! lowercase letters or carries a chapter/section/volume/part marker. The
//! rule over- and under-detects; it is a navigation aid only.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Headings must be strictly shorter than this many characters (trimmed)
pub const MAX_HEADING_CHARS: usize = 30;

// English markers are whole words, optionally glued to a number ("Chapter12")
static RE_HEADING_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)第.{0,12}?[章节卷篇]|\b(?:chapter|section|part)(?:\b|\d)")
        .expect("valid heading regex")
});

/// A detected heading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Line text with surrounding whitespace trimmed
    pub title: String,

    /// Zero-based line index
    pub position: usize,
}

/// Classify a single line of text
pub fn is_chapter_heading(line: &str) -> bool {
    let trimmed = line.trim();
    let len = trimmed.chars().count();
    if len == 0 || len >= MAX_HEADING_CHARS {
        return false;
    }

    trimmed.to_uppercase() == trimmed || RE_HEADING_MARKER.is_match(trimmed)
}

/// Collect every heading line in order
pub fn detect_headings(text: &str) -> Vec<Heading> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| is_chapter_heading(line))
        .map(|(position, line)| Heading {
            title: line.trim().to_string(),
            position,
        })
        .collect()
}
