//! Atomic file operations shared by the models store, settings and templates.
//!
//! Writes go temp file → fsync → rename so a crash mid-write never leaves a
//! truncated `models.json` or `config.toml` behind.

use crate::error::{MigrateError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `contents` to `path` atomically, creating parent directories.
///
/// On unix the file is restricted to `0o600` since both the models file and
/// the settings file may carry API keys.
///
/// # Errors
///
/// Returns [`MigrateError::Io`] on directory creation, write, sync or rename failure.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = tmp_path_for(path);
    let mut file = std::fs::File::create(&tmp_path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp_path, path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }

    Ok(())
}

/// Copy `path` to `{path}.backup`. Returns the backup path, or `None` when
/// there was nothing to back up.
///
/// # Errors
///
/// Returns [`MigrateError::Io`] if the copy fails.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let backup_path = append_extension(path, "backup");
    std::fs::copy(path, &backup_path).map_err(|e| {
        MigrateError::Io(std::io::Error::new(
            e.kind(),
            format!(
                "failed to back up '{}' to '{}': {e}",
                path.display(),
                backup_path.display()
            ),
        ))
    })?;
    Ok(Some(backup_path))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    append_extension(path, "tmp")
}

/// `models.json` + `backup` → `models.json.backup`.
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
