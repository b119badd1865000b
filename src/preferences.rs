//! User preferences kept alongside the catalog.
//!
//! The core never reads these; they are persisted for the surrounding UI.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::library::LibraryError;
use crate::store::KeyValueStore;

/// Key holding the display language code
pub const LANGUAGE_KEY: &str = "shelf.language";

/// Key holding the reader display settings (JSON)
pub const READER_SETTINGS_KEY: &str = "shelf.reader_settings";

/// Display language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "zh" | "zh-cn" | "chinese" => Ok(Language::Zh),
            "en" | "en-us" | "english" => Ok(Language::En),
            _ => anyhow::bail!("Unknown language: {}", s),
        }
    }
}

/// Reader color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Sepia,
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "sepia" => Ok(Theme::Sepia),
            _ => anyhow::bail!("Unknown theme: {}", s),
        }
    }
}

/// Reader display settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderSettings {
    #[serde(default = "default_font_size")]
    pub font_size: u16,

    #[serde(default)]
    pub theme: Theme,
}

fn default_font_size() -> u16 {
    16
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            theme: Theme::default(),
        }
    }
}

/// Preference accessors over the key-value store
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored language, or the default when unset or unreadable
    pub async fn language(&self) -> Language {
        match self.store.get(LANGUAGE_KEY).await {
            Ok(Some(code)) => code.parse().unwrap_or_else(|e| {
                warn!("Ignoring stored language: {e}");
                Language::default()
            }),
            Ok(None) => Language::default(),
            Err(e) => {
                warn!("Failed to read language preference: {e}");
                Language::default()
            }
        }
    }

    pub async fn set_language(&self, language: Language) -> Result<(), LibraryError> {
        self.store
            .set(LANGUAGE_KEY, language.code())
            .await
            .map_err(LibraryError::StorageWrite)
    }

    /// Stored reader settings, or defaults when unset or corrupt
    pub async fn reader_settings(&self) -> ReaderSettings {
        let raw = match self.store.get(READER_SETTINGS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return ReaderSettings::default(),
            Err(e) => {
                warn!("Failed to read reader settings: {e}");
                return ReaderSettings::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring corrupt reader settings: {e}");
            ReaderSettings::default()
        })
    }

    pub async fn set_reader_settings(&self, settings: ReaderSettings) -> Result<(), LibraryError> {
        let json = serde_json::to_string(&settings)
            .map_err(|e| LibraryError::StorageWrite(e.into()))?;

        self.store
            .set(READER_SETTINGS_KEY, &json)
            .await
            .map_err(LibraryError::StorageWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_language_defaults_and_persists() {
        let prefs = Preferences::new(Arc::new(MemoryStore::new()));
        assert_eq!(prefs.language().await, Language::Zh);

        prefs.set_language(Language::En).await.unwrap();
        assert_eq!(prefs.language().await, Language::En);
    }

    #[tokio::test]
    async fn test_unknown_language_code_falls_back() {
        let store = MemoryStore::with_values([(LANGUAGE_KEY, "klingon")]);
        let prefs = Preferences::new(Arc::new(store));
        assert_eq!(prefs.language().await, Language::Zh);
    }

    #[tokio::test]
    async fn test_reader_settings_partial_json_uses_defaults() {
        let store = MemoryStore::with_values([(READER_SETTINGS_KEY, r#"{"theme":"dark"}"#)]);
        let prefs = Preferences::new(Arc::new(store));

        let settings = prefs.reader_settings().await;
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.font_size, 16);
    }

    #[tokio::test]
    async fn test_set_language_propagates_write_failure() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes(true);
        let prefs = Preferences::new(store);

        assert!(matches!(
            prefs.set_language(Language::En).await,
            Err(LibraryError::StorageWrite(_))
        ));
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!("EN".parse::<Language>().unwrap(), Language::En);
        assert_eq!("zh".parse::<Language>().unwrap(), Language::Zh);
        assert!("fr".parse::<Language>().is_err());
    }
}
