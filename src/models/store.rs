//! Persisted models document (`models.json`).
//!
//! The file wraps the records in a small envelope:
//!
//! ```json
//! {
//!   "__meta__": {"version": "2.4.47", "app.version": "2.4.47", "updated_at": "..."},
//!   "items": { "gpt-4o": { ... } }
//! }
//! ```
//!
//! `__meta__.version` is the stored version tag the migrator gates on. Only
//! [`JsonModelStore::save`] rewrites it. Other `__meta__` fields and other
//! top-level keys are carried over from the last load.

use crate::error::{MigrateError, Result};
use crate::persist::write_atomic;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::types::ModelDocument;

/// Document store collaborator used by the migrator.
pub trait ModelStore {
    /// Load the full document from persistent storage.
    fn load(&mut self) -> Result<ModelDocument>;

    /// Persist `document`, stamping it with the running app version.
    fn save(&mut self, document: &ModelDocument) -> Result<()>;

    /// The version tag recorded in the persisted document's own metadata.
    fn stored_version(&self) -> Result<Version>;

    /// Insert records known to the shipped defaults but absent from
    /// `document`. Returns how many records were inserted.
    fn reconcile_missing(&mut self, document: &mut ModelDocument) -> Result<usize>;
}

/// `__meta__` envelope header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(rename = "app.version", default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// On-disk shape of `models.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelsFile {
    #[serde(rename = "__meta__", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FileMeta>,
    #[serde(default)]
    pub items: ModelDocument,
    /// Top-level keys other than `__meta__` and `items`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ModelsFile {
    /// Parse the `__meta__.version` tag.
    ///
    /// # Errors
    ///
    /// [`MigrateError::MissingVersion`] when there is no tag,
    /// [`MigrateError::InvalidVersion`] when it does not parse.
    pub fn version(&self) -> Result<Version> {
        let tag = self
            .meta
            .as_ref()
            .and_then(|m| m.version.as_deref())
            .ok_or_else(|| MigrateError::MissingVersion("no __meta__.version tag".to_owned()))?;
        Version::parse(tag)
    }
}

/// Read and parse a models file.
///
/// # Errors
///
/// Returns [`MigrateError::Store`] if the file cannot be read or parsed.
pub fn read_models_file(path: &Path) -> Result<ModelsFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MigrateError::Store(format!(
            "failed to read models file '{}': {e}",
            path.display()
        ))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        MigrateError::Store(format!(
            "failed to parse models file '{}': {e}",
            path.display()
        ))
    })
}

/// JSON file backed [`ModelStore`].
#[derive(Debug, Clone)]
pub struct JsonModelStore {
    path: PathBuf,
    template_path: PathBuf,
    app_version: Version,
    /// Envelope of the last loaded file, minus its items.
    meta: Option<FileMeta>,
    extra: BTreeMap<String, serde_json::Value>,
}

impl JsonModelStore {
    /// Store for the user file at `path`. `template_path` is the shipped
    /// default used by [`ModelStore::reconcile_missing`]; `app_version` is
    /// written into `__meta__` on save.
    pub fn new(path: PathBuf, template_path: PathBuf, app_version: Version) -> Self {
        Self {
            path,
            template_path,
            app_version,
            meta: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn app_version(&self) -> Version {
        self.app_version
    }

    fn meta_for_save(&self) -> FileMeta {
        let version = self.app_version.to_string();
        let mut meta = self.meta.clone().unwrap_or_default();
        meta.version = Some(version.clone());
        meta.app_version = Some(version);
        meta.updated_at = Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string());
        meta
    }
}

impl ModelStore for JsonModelStore {
    fn load(&mut self) -> Result<ModelDocument> {
        let file = read_models_file(&self.path)?;
        debug!(
            path = %self.path.display(),
            records = file.items.len(),
            "loaded models"
        );
        self.meta = file.meta;
        self.extra = file.extra;
        Ok(file.items)
    }

    fn save(&mut self, document: &ModelDocument) -> Result<()> {
        let meta = self.meta_for_save();
        let file = ModelsFile {
            meta: Some(meta.clone()),
            items: document.clone(),
            extra: self.extra.clone(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| MigrateError::Store(format!("failed to serialize models: {e}")))?;
        write_atomic(&self.path, &json)?;
        self.meta = Some(meta);
        info!(
            path = %self.path.display(),
            version = %self.app_version,
            records = document.len(),
            "saved models"
        );
        Ok(())
    }

    fn stored_version(&self) -> Result<Version> {
        read_models_file(&self.path)?.version()
    }

    fn reconcile_missing(&mut self, document: &mut ModelDocument) -> Result<usize> {
        let template = read_models_file(&self.template_path)?;
        let mut added = 0usize;
        for (key, record) in template.items.iter() {
            if !document.contains(key) {
                debug!(model = key, "adding missing model");
                document.insert(key, record.clone());
                added += 1;
            }
        }
        if added > 0 {
            self.save(document)?;
            info!(added, "patched missing models");
        }
        Ok(added)
    }
}
