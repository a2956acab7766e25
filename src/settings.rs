//! Application settings (`config.toml`).
//!
//! Settings are a flat table of keys such as `api_key_google` or
//! `api_azure_endpoint`. Model records refer to them through `{key}`
//! placeholders. Keys this crate does not know about are preserved.

use crate::error::{MigrateError, Result};
use crate::persist::write_atomic;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Global configuration collaborator used by migration steps.
pub trait ConfigStore {
    /// Current string value of `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Set `key` in memory. Call [`ConfigStore::save`] to persist.
    fn set(&mut self, key: &str, value: &str);

    /// Persist all pending changes.
    fn save(&mut self) -> Result<()>;
}

/// TOML file backed [`ConfigStore`].
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    path: PathBuf,
    table: toml::Table,
}

impl TomlConfigStore {
    /// Load settings from `path`. A missing file yields an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Config`] if the file exists but cannot be read or parsed.
    pub fn load(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path,
                table: toml::Table::new(),
            });
        }
        let content = std::fs::read_to_string(&path).map_err(|e| {
            MigrateError::Config(format!("failed to read config '{}': {e}", path.display()))
        })?;
        let table = content.parse::<toml::Table>().map_err(|e| {
            MigrateError::Config(format!("failed to parse config '{}': {e}", path.display()))
        })?;
        Ok(Self { path, table })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for TomlConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.table
            .get(key)
            .and_then(toml::Value::as_str)
            .map(str::to_owned)
    }

    fn set(&mut self, key: &str, value: &str) {
        self.table
            .insert(key.to_owned(), toml::Value::String(value.to_owned()));
    }

    fn save(&mut self) -> Result<()> {
        let content = toml::to_string_pretty(&self.table)
            .map_err(|e| MigrateError::Config(format!("failed to serialize config: {e}")))?;
        write_atomic(&self.path, &content)?;
        debug!(path = %self.path.display(), "saved config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlConfigStore::load(dir.path().join("config.toml")).unwrap();
        assert!(store.get("api_key_google").is_none());
    }

    #[test]
    fn set_save_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut store = TomlConfigStore::load(path.clone()).unwrap();
        store.set("api_key_google", "sk-real-value");
        store.save().unwrap();

        let reloaded = TomlConfigStore::load(path).unwrap();
        assert_eq!(reloaded.get("api_key_google").as_deref(), Some("sk-real-value"));
    }

    #[test]
    fn unknown_keys_survive_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "theme = \"dark\"\nfont_size = 12\n").unwrap();

        let mut store = TomlConfigStore::load(path.clone()).unwrap();
        store.set("api_azure_version", "2023-07-01-preview");
        store.save().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("theme = \"dark\""));
        assert!(raw.contains("font_size = 12"));
        assert!(raw.contains("api_azure_version"));
    }

    #[test]
    fn non_string_values_are_not_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "font_size = 12\n").unwrap();
        let store = TomlConfigStore::load(path).unwrap();
        assert!(store.get("font_size").is_none());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "{{{ not toml").unwrap();
        let err = TomlConfigStore::load(path).unwrap_err();
        assert_eq!(err.code(), "CONFIG_FAILED");
    }
}
