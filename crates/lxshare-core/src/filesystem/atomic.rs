//! Replace-by-rename file writes.
//!
//! Content goes to a hidden sibling, is fsynced, takes over the original's
//! mode and owner, and is renamed over the target. Readers see either the
//! old file or the new one, never a partial write.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use lxshare_common::error::{LxshareError, Result};

/// Suffix of temporary files created next to the target.
pub const TMP_SUFFIX: &str = ".lxshare.tmp";

const DEFAULT_MODE: u32 = 0o644;

static NEXT_TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> LxshareError + '_ {
    move |source| LxshareError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn tmp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(|| "target".into(), |n| n.to_string_lossy().into_owned());
    let ctr = NEXT_TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = format!(".{name}.{}.{ctr}{TMP_SUFFIX}", std::process::id());
    target.with_file_name(tmp)
}

/// Atomically replaces `target` with `content`.
///
/// A missing target is created with mode `0644`.
///
/// # Errors
///
/// Returns an error if any write, sync, metadata, or rename step fails. The
/// temporary file is removed on failure.
pub fn replace_file(target: &Path, content: &str) -> Result<()> {
    replace_file_with_mode(target, content, None)
}

/// Atomically replaces `target` with `content` and gives it `mode`, or the
/// previous file's mode when `mode` is `None`.
///
/// The temporary file is created `0600`, so content never becomes visible
/// under a looser mode than the final one.
///
/// # Errors
///
/// Same as [`replace_file`].
pub fn replace_file_with_mode(target: &Path, content: &str, mode: Option<u32>) -> Result<()> {
    let tmp = tmp_path(target);
    let result = write_and_rename(target, &tmp, content, mode);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(target: &Path, tmp: &Path, content: &str, mode: Option<u32>) -> Result<()> {
    let existing = match fs::metadata(target) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(source) => return Err(io_err(target)(source)),
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(tmp)
        .map_err(io_err(tmp))?;
    file.write_all(content.as_bytes()).map_err(io_err(tmp))?;
    file.sync_all().map_err(io_err(tmp))?;

    let mode = mode.unwrap_or_else(|| {
        existing
            .as_ref()
            .map_or(DEFAULT_MODE, |meta| meta.permissions().mode() & 0o7777)
    });
    fs::set_permissions(tmp, fs::Permissions::from_mode(mode)).map_err(io_err(tmp))?;
    if let Some(meta) = &existing {
        std::os::unix::fs::chown(tmp, Some(meta.uid()), Some(meta.gid())).map_err(io_err(tmp))?;
    }
    drop(file);

    fs::rename(tmp, target).map_err(io_err(target))?;
    fsync_parent_dir(target).map_err(io_err(target))?;
    tracing::debug!(path = %target.display(), bytes = content.len(), "replaced file");
    Ok(())
}

/// Fsyncs the parent directory of `path` so the rename is durable.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be opened or synced.
pub fn fsync_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}
