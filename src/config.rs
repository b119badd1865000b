//! Configuration for shelf paths and import limits.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SHELF_HOME, SHELF_CONTENT_DIR)
//! 2. Config file (.shelf/config.yaml)
//! 3. Defaults (~/.shelf)
//!
//! Config file discovery:
//! - Searches current directory and parents for .shelf/config.yaml
//! - Paths in config file are relative to the `.shelf/` directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::BookFormat;
use crate::library::{ImportPolicy, DEFAULT_MAX_IMPORT_BYTES};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub import: Option<ImportConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to the config file's directory)
    pub home: Option<String>,
    /// Content directory (relative to the config file's directory)
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    pub max_size_bytes: Option<u64>,
    /// MIME types or extensions, e.g. `["text/plain", "epub"]`
    pub accepted_types: Option<Vec<String>>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Shelf state directory
    pub home: PathBuf,
    /// Directory of materialized content files
    pub content_dir: PathBuf,
    /// Key-value store file
    pub store_path: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Import limits
    pub import: ImportSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub max_size_bytes: u64,
    pub accepted: Vec<BookFormat>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_IMPORT_BYTES,
            accepted: BookFormat::ALL.to_vec(),
        }
    }
}

impl ImportSettings {
    /// Import policy enforcing these settings
    pub fn policy(&self) -> ImportPolicy {
        ImportPolicy {
            max_size_bytes: self.max_size_bytes,
            accepted: self.accepted.clone(),
        }
    }

    fn from_config(config: Option<&ImportConfig>) -> Result<Self> {
        let defaults = Self::default();
        let Some(config) = config else {
            return Ok(defaults);
        };

        let accepted = match &config.accepted_types {
            Some(types) => types
                .iter()
                .map(|t| t.parse::<BookFormat>())
                .collect::<Result<Vec<_>>>()
                .context("Invalid import.accepted_types")?,
            None => defaults.accepted,
        };

        Ok(Self {
            max_size_bytes: config.max_size_bytes.unwrap_or(defaults.max_size_bytes),
            accepted,
        })
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".shelf").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".shelf");

    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    let shelf_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let home = if let Ok(env_home) = std::env::var("SHELF_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = file.as_ref().and_then(|f| f.paths.home.as_deref()) {
        resolve_path(shelf_dir, home_path)
    } else {
        default_home
    };

    let content_dir = if let Ok(env_content) = std::env::var("SHELF_CONTENT_DIR") {
        PathBuf::from(env_content)
    } else if let Some(content_path) = file.as_ref().and_then(|f| f.paths.content.as_deref()) {
        resolve_path(shelf_dir, content_path)
    } else {
        home.join("books")
    };

    let import = ImportSettings::from_config(file.as_ref().and_then(|f| f.import.as_ref()))?;

    Ok(ResolvedConfig {
        store_path: home.join("store.json"),
        home,
        content_dir,
        config_file,
        import,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
