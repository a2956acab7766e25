//! Shipped default resources.
//!
//! The application ships pristine copies of its data files (`models.json`,
//! ...) in a templates directory. [`BundledTemplates::patch_file`] installs
//! them into the user config directory, either when missing or forcibly when
//! a migration decides the user copy is too old to patch in place.

use crate::error::{MigrateError, Result};
use crate::persist::{backup_file, write_atomic};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Template-reload collaborator used by forced-reload migration steps.
pub trait TemplateSource {
    /// Overwrite the user copy of `resource` with the shipped default.
    fn force_replace(&self, resource: &str) -> Result<()>;
}

/// Copies resources from a bundled directory into the user directory.
///
/// Each resource is backed up at most once per instance, so a run that
/// force-replaces the same file twice keeps the user's copy rather than
/// the first replacement.
#[derive(Debug, Clone)]
pub struct BundledTemplates {
    bundled_dir: PathBuf,
    user_dir: PathBuf,
    backed_up: RefCell<BTreeSet<String>>,
}

impl BundledTemplates {
    pub fn new(bundled_dir: PathBuf, user_dir: PathBuf) -> Self {
        Self {
            bundled_dir,
            user_dir,
            backed_up: RefCell::new(BTreeSet::new()),
        }
    }

    /// Path of the shipped copy of `resource`.
    pub fn bundled_path(&self, resource: &str) -> PathBuf {
        self.bundled_dir.join(resource)
    }

    /// Path of the user copy of `resource`.
    pub fn user_path(&self, resource: &str) -> PathBuf {
        self.user_dir.join(resource)
    }

    /// Install `resource` into the user directory.
    ///
    /// Without `force` this only fills in a missing file. With `force` the
    /// existing user file is backed up to `<resource>.backup` and replaced;
    /// later forced writes of the same resource leave that backup alone.
    /// Returns `true` if the user file was written.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Template`] if the bundled copy is missing or
    /// unreadable, and I/O errors from the backup or write.
    pub fn patch_file(&self, resource: &str, force: bool) -> Result<bool> {
        let dst = self.user_path(resource);
        if dst.exists() && !force {
            return Ok(false);
        }

        let src = self.bundled_path(resource);
        let content = read_template(&src)?;

        let first_write = !self.backed_up.borrow().contains(resource);
        if first_write && let Some(backup) = backup_file(&dst)? {
            self.backed_up.borrow_mut().insert(resource.to_owned());
            warn!(
                resource,
                backup = %backup.display(),
                "replacing user file with shipped default"
            );
        }
        write_atomic(&dst, &content)?;
        info!(resource, path = %dst.display(), force, "installed template");
        Ok(true)
    }
}

impl TemplateSource for BundledTemplates {
    fn force_replace(&self, resource: &str) -> Result<()> {
        self.patch_file(resource, true).map(|_| ())
    }
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        MigrateError::Template(format!(
            "failed to read bundled template '{}': {e}",
            path.display()
        ))
    })
}
