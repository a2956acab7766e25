//! Application directory paths.
//!
//! | Purpose | Linux | macOS |
//! |---------|-------|-------|
//! | Config (user `models.json`, `config.toml`) | `~/.config/model-migrate/` | `~/Library/Application Support/model-migrate/` |
//! | Data (bundled templates) | `~/.local/share/model-migrate/templates/` | `~/Library/Application Support/model-migrate/templates/` |
//!
//! # Environment Overrides
//!
//! - `MODEL_MIGRATE_CONFIG_DIR` overrides [`config_dir`]
//! - `MODEL_MIGRATE_DATA_DIR` overrides [`data_dir`]

use std::path::PathBuf;

const APP_DIR_NAME: &str = "model-migrate";

/// File name of the persisted model definitions.
pub const MODELS_FILE: &str = "models.json";

/// File name of the application settings.
pub const CONFIG_FILE: &str = "config.toml";

/// User config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MODEL_MIGRATE_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/model-migrate-config"))
}

/// Application data root directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MODEL_MIGRATE_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/model-migrate-data"))
}

/// Directory holding the shipped default resources (`data_dir()/templates/`).
#[must_use]
pub fn templates_dir() -> PathBuf {
    data_dir().join("templates")
}

/// User models file (`config_dir()/models.json`).
#[must_use]
pub fn models_file() -> PathBuf {
    config_dir().join(MODELS_FILE)
}

/// Application settings file (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_config_dir() {
        let dir = config_dir();
        assert_eq!(models_file(), dir.join("models.json"));
        assert_eq!(config_file(), dir.join("config.toml"));
    }

    #[test]
    fn templates_live_under_data_dir() {
        assert!(templates_dir().starts_with(data_dir()));
        assert!(templates_dir().ends_with("templates"));
    }
}
