//! Command-line interface for shelf.
//!
//! Provides commands for importing books, listing and inspecting the
//! catalog, reading text with its detected table of contents, and managing
//! preferences.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config;
use crate::domain::{BookRecord, Bookmark, ReadingProgress};
use crate::library::{CatalogStore, ContentCache, ContentStore, ImportPolicy, ImportRequest};
use crate::preferences::{Language, Preferences, Theme};
use crate::store::{JsonFileStore, KeyValueStore};

/// shelf - Local e-book shelf
#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import a book file (EPUB, TXT or PDF)
    Import {
        /// File to import
        path: PathBuf,

        /// Declared MIME type (derived from the extension if not given)
        #[arg(short, long)]
        mime: Option<String>,

        /// Custom title (file name if not specified)
        #[arg(long)]
        title: Option<String>,

        /// Author
        #[arg(long)]
        author: Option<String>,
    },

    /// List books on the shelf
    List {
        /// Maximum number of books to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show details of a book
    Show {
        /// Book ID
        id: String,
    },

    /// Print a book's text
    Read {
        /// Book ID
        id: String,

        /// First line to print (zero-based)
        #[arg(short, long, default_value = "0")]
        from: usize,

        /// Number of lines to print
        #[arg(short = 'n', long, default_value = "40")]
        lines: usize,
    },

    /// Show the detected table of contents
    Toc {
        /// Book ID
        id: String,
    },

    /// Save the reading position of a book
    Progress {
        /// Book ID
        id: String,

        /// Current page
        page: usize,

        /// Total pages
        #[arg(long)]
        total: Option<usize>,

        /// Current chapter index
        #[arg(long)]
        chapter: Option<usize>,
    },

    /// Bookmark a line of a book
    Bookmark {
        /// Book ID
        id: String,

        /// Line index
        position: usize,

        /// Optional note
        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a book and its content file
    Delete {
        /// Book ID
        id: String,
    },

    /// Show or set the display language (zh, en)
    Language {
        /// Language code to set
        code: Option<String>,
    },

    /// Show or change reader display settings
    Settings {
        /// Font size in points
        #[arg(long)]
        font_size: Option<u16>,

        /// Theme (light, dark, sepia)
        #[arg(long)]
        theme: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Stores opened from the resolved configuration
struct Shelf {
    catalog: CatalogStore,
    preferences: Preferences,
    import_policy: ImportPolicy,
}

impl Shelf {
    async fn open() -> Result<Self> {
        let cfg = config::config()?;

        let store: Arc<dyn KeyValueStore> = Arc::new(
            JsonFileStore::open(&cfg.store_path)
                .await
                .with_context(|| format!("Failed to open store: {}", cfg.store_path.display()))?,
        );
        let content = ContentStore::new(&cfg.content_dir, ContentCache::new());
        let catalog = CatalogStore::new(store.clone(), content);
        catalog.initialize().await?;

        Ok(Self {
            catalog,
            preferences: Preferences::new(store),
            import_policy: cfg.import.policy(),
        })
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        if let Commands::Config = self.command {
            return show_config();
        }

        let shelf = Shelf::open().await?;

        match self.command {
            Commands::Import {
                path,
                mime,
                title,
                author,
            } => import_book(&shelf, path, mime, title, author).await,
            Commands::List { limit } => list_books(&shelf, limit).await,
            Commands::Show { id } => show_book(&shelf, &id).await,
            Commands::Read { id, from, lines } => read_book(&shelf, &id, from, lines).await,
            Commands::Toc { id } => show_toc(&shelf, &id).await,
            Commands::Progress {
                id,
                page,
                total,
                chapter,
            } => {
                let progress = ReadingProgress {
                    last_page: page,
                    total_pages: total,
                    chapter_index: chapter,
                };
                shelf.catalog.record_progress(&id, progress).await?;
                println!("Saved position: page {}", page);
                Ok(())
            }
            Commands::Bookmark { id, position, note } => {
                let mut bookmark = Bookmark::new(position);
                bookmark.note = note;
                let record = shelf.catalog.add_bookmark(&id, bookmark).await?;
                println!("Bookmarked line {} ({} bookmarks)", position, record.bookmarks.len());
                Ok(())
            }
            Commands::Delete { id } => delete_book(&shelf, &id).await,
            Commands::Language { code } => language(&shelf, code).await,
            Commands::Settings { font_size, theme } => settings(&shelf, font_size, theme).await,
            Commands::Config => show_config(),
        }
    }
}

/// Import a file into the shelf
async fn import_book(
    shelf: &Shelf,
    path: PathBuf,
    mime: Option<String>,
    title: Option<String>,
    author: Option<String>,
) -> Result<()> {
    let mut request = ImportRequest::from_path(&path, mime);
    request.title = title;
    request.author = author;

    let record = shelf
        .catalog
        .import(&request, &shelf.import_policy)
        .await
        .with_context(|| format!("Failed to import {}", path.display()))?;

    println!("Imported: {}", record.title);
    println!("  ID:   {}", record.id);
    println!("  Type: {}", record.file_type);
    println!("  File: {}", record.file_path.display());

    Ok(())
}

/// Truncate to `max` characters, appending an ellipsis
fn truncate_title(title: &str, max: usize) -> String {
    if title.chars().count() > max {
        let head: String = title.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

async fn list_books(shelf: &Shelf, limit: usize) -> Result<()> {
    let books = shelf.catalog.get_all_books().await;

    if books.is_empty() {
        println!("Shelf is empty. Use 'shelf import <file>' to add a book.");
        return Ok(());
    }

    println!("{:<38} {:<6} {:<40}", "ID", "TYPE", "TITLE");
    println!("{}", "-".repeat(86));

    for book in books.iter().take(limit) {
        let kind = book
            .format()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{:<38} {:<6} {:<40}",
            book.id,
            kind,
            truncate_title(&book.title, 40)
        );
    }

    println!("\nTotal: {} books", books.len());

    Ok(())
}

async fn find_book(shelf: &Shelf, id: &str) -> Result<BookRecord> {
    shelf
        .catalog
        .get_book(id)
        .await
        .with_context(|| format!("Book not found: {}", id))
}

async fn show_book(shelf: &Shelf, id: &str) -> Result<()> {
    let book = find_book(shelf, id).await?;
    let readable = shelf.catalog.content().is_readable(&book.file_path).await;

    println!("Title:     {}", book.title);
    if let Some(author) = &book.author {
        println!("Author:    {}", author);
    }
    println!("ID:        {}", book.id);
    println!("Type:      {}", book.file_type);
    println!(
        "File:      {}{}",
        book.file_path.display(),
        if readable { "" } else { " (not readable)" }
    );
    println!("Last read: {}", book.last_read.format("%Y-%m-%d %H:%M"));
    if let Some(page) = book.last_page {
        match book.total_pages {
            Some(total) => println!("Position:  page {} of {}", page, total),
            None => println!("Position:  page {}", page),
        }
    }
    println!("Bookmarks: {}", book.bookmarks.len());
    println!("Highlights: {}", book.highlights.len());

    Ok(())
}

async fn read_book(shelf: &Shelf, id: &str, from: usize, lines: usize) -> Result<()> {
    let opened = shelf.catalog.open_book(id).await?;

    let total = opened.text.lines().count();
    for line in opened.text.lines().skip(from).take(lines) {
        println!("{}", line);
    }

    if total > 0 {
        let (start, end) = shown_range(from, lines, total);
        eprintln!("\n[lines {}-{} of {}]", start, end, total);
    }

    Ok(())
}

/// Clamp a `--from`/`--lines` window to the text length
fn shown_range(from: usize, lines: usize, total: usize) -> (usize, usize) {
    (from.min(total), from.saturating_add(lines).min(total))
}

async fn show_toc(shelf: &Shelf, id: &str) -> Result<()> {
    let opened = shelf.catalog.open_book(id).await?;

    if opened.headings.is_empty() {
        println!("No headings detected in: {}", opened.record.title);
        return Ok(());
    }

    println!("Contents of {}:\n", opened.record.title);
    for heading in &opened.headings {
        println!("  {:>6}  {}", heading.position, heading.title);
    }

    Ok(())
}

async fn delete_book(shelf: &Shelf, id: &str) -> Result<()> {
    match shelf.catalog.delete_book(id).await? {
        Some(book) => println!("Deleted: {}", book.title),
        None => println!("No book with ID: {}", id),
    }
    Ok(())
}

async fn language(shelf: &Shelf, code: Option<String>) -> Result<()> {
    match code {
        Some(code) => {
            let language: Language = code.parse()?;
            shelf.preferences.set_language(language).await?;
            println!("Language set to: {}", language);
        }
        None => println!("{}", shelf.preferences.language().await),
    }
    Ok(())
}

async fn settings(shelf: &Shelf, font_size: Option<u16>, theme: Option<String>) -> Result<()> {
    let mut settings = shelf.preferences.reader_settings().await;

    if font_size.is_some() || theme.is_some() {
        if let Some(size) = font_size {
            settings.font_size = size;
        }
        if let Some(theme) = theme {
            settings.theme = theme.parse::<Theme>()?;
        }
        shelf.preferences.set_reader_settings(settings).await?;
    }

    println!("Font size: {}", settings.font_size);
    println!("Theme:     {:?}", settings.theme);
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Shelf Configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:    {}", cfg.home.display());
    println!("  Content: {}", cfg.content_dir.display());
    println!("  Store:   {}", cfg.store_path.display());
    println!();
    println!("Import:");
    println!("  Max size: {} bytes", cfg.import.max_size_bytes);
    let accepted: Vec<String> = cfg.import.accepted.iter().map(|f| f.to_string()).collect();
    println!("  Accepted: {}", accepted.join(", "));

    Ok(())
}
