//! Root-only CIFS credentials files referenced by `credentials=`.

use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

use lxshare_common::error::{LxshareError, Result};

use crate::filesystem::atomic;

/// Mode of credentials files.
pub const CREDENTIALS_MODE: u32 = 0o600;

const CREDENTIALS_DIR_MODE: u32 = 0o700;

/// Contents of a `mount.cifs` credentials file.
#[must_use]
pub fn render(username: &str, password: &str) -> String {
    format!("username={username}\npassword={password}\n")
}

/// Writes the credentials file at `path`, creating its directory `0700`
/// and the file `0600`. An existing file is replaced.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_credentials(path: &Path, username: &str, password: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(CREDENTIALS_DIR_MODE)
            .create(parent)
            .map_err(|source| LxshareError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    atomic::replace_file_with_mode(path, &render(username, password), Some(CREDENTIALS_MODE))?;
    tracing::info!(path = %path.display(), "credentials file written");
    Ok(())
}
