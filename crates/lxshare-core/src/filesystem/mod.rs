//! Transactional text-file edits: advisory locks, atomic replacement,
//! and timestamped backups.

pub mod atomic;
pub mod backup;
pub mod lock;

use std::path::Path;

use lxshare_common::error::{LxshareError, Result};

/// Reads a text file, returning `None` if it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(LxshareError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Appends `line` to `content`, inserting a newline first when the existing
/// content does not end with one.
#[must_use]
pub fn append_line(content: &str, line: &str) -> String {
    let mut out = String::with_capacity(content.len() + line.len() + 2);
    out.push_str(content);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
    out
}
