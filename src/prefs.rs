//! User preference storage.
//!
//! The renderer reads and writes the visitor's language choice through the
//! [`UserPreferences`] trait instead of a process-wide store, so a render is
//! a function of what was injected. [`FilePreferences`] persists across runs
//! as a small JSON object, the way browser local storage would.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key under which the chosen language is stored.
pub const LANG_KEY: &str = "site-lang";

#[derive(Error, Debug)]
pub enum PrefsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait UserPreferences: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError>;
}

/// Preferences that live only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl UserPreferences for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences backed by a JSON file. Every `set` writes the whole file.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferences {
    /// Load from `path`. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt preferences file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl UserPreferences for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PrefsError> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_preferences_round_trip() {
        let mut prefs = MemoryPreferences::new();
        assert_eq!(prefs.get(LANG_KEY), None);
        prefs.set(LANG_KEY, "fr").unwrap();
        assert_eq!(prefs.get(LANG_KEY).as_deref(), Some("fr"));
    }

    #[test]
    fn file_preferences_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let prefs = FilePreferences::load(tmp.path().join("prefs.json"));
        assert_eq!(prefs.get(LANG_KEY), None);
    }

    #[test]
    fn file_preferences_persist_across_loads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state/prefs.json");

        let mut prefs = FilePreferences::load(&path);
        prefs.set(LANG_KEY, "fr").unwrap();

        let reloaded = FilePreferences::load(&path);
        assert_eq!(reloaded.get(LANG_KEY).as_deref(), Some("fr"));
    }

    #[test]
    fn file_preferences_corrupt_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();

        let mut prefs = FilePreferences::load(&path);
        assert_eq!(prefs.get(LANG_KEY), None);
        prefs.set(LANG_KEY, "en").unwrap();
        assert_eq!(
            FilePreferences::load(&path).get(LANG_KEY).as_deref(),
            Some("en")
        );
    }
}
