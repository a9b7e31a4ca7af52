//! Timestamped copies taken before a file is rewritten.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use lxshare_common::constants::APP_NAME;
use lxshare_common::error::{LxshareError, Result};

/// Path of the backup for `path` taken at `at`:
/// `<name>.lxshare-<YYYYmmddTHHMMSS>.bak` in the same directory.
#[must_use]
pub fn backup_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "file".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!("{name}.{APP_NAME}-{}.bak", at.format("%Y%m%dT%H%M%S")))
}

/// Copies `path` to its timestamped backup. Returns `None` when there is
/// nothing to back up.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let dest = backup_path(path, Utc::now());
    let _ = std::fs::copy(path, &dest).map_err(|source| LxshareError::Io {
        path: dest.clone(),
        source,
    })?;
    tracing::debug!(source = %path.display(), backup = %dest.display(), "backed up file");
    Ok(Some(dest))
}
