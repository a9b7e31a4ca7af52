//! Host mount table entries for CIFS shares.
//!
//! Entries are keyed by the (remote path, local path) pair. A pair is
//! written at most once; existing lines are never rewritten or removed.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

use lxshare_common::config::HostLayout;
use lxshare_common::constants::{
    CIFS_BASE_OPTIONS, CIFS_FSTYPE, HOST_MAPPED_GID, HOST_MAPPED_UID, LOCK_TIMEOUT_MS,
};
use lxshare_common::error::Result;
use lxshare_common::types::{PermissionMode, ShareConfig};

use crate::filesystem::{self, atomic, backup, lock::EditLock};

/// Where the CIFS client gets its login from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// `username=` and `password=` embedded in the options.
    Inline {
        /// SMB user name.
        username: String,
        /// SMB password.
        password: String,
    },
    /// `credentials=<path>` pointing at a root-only file.
    File(PathBuf),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline { username, .. } => f
                .debug_struct("Inline")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// One CIFS line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// UNC-style source, `//host/share`.
    pub remote: String,
    /// Host mount point.
    pub local: PathBuf,
    /// Ownership, permission, and login options.
    pub credentials: CredentialSource,
    /// Directory mode option.
    pub dir_mode: PermissionMode,
    /// File mode option.
    pub file_mode: PermissionMode,
}

impl MountEntry {
    /// Builds the entry for a share with the given credential source.
    #[must_use]
    pub fn for_share(
        cfg: &ShareConfig,
        layout: &HostLayout,
        credentials: CredentialSource,
    ) -> Self {
        Self {
            remote: cfg.remote_path(),
            local: layout.host_mount_path(&cfg.folder),
            credentials,
            dir_mode: cfg.dir_mode.clone(),
            file_mode: cfg.file_mode.clone(),
        }
    }

    /// Builds the entry with the login inline.
    #[must_use]
    pub fn inline(cfg: &ShareConfig, layout: &HostLayout) -> Self {
        Self::for_share(
            cfg,
            layout,
            CredentialSource::Inline {
                username: cfg.username.clone(),
                password: cfg.password.expose().to_owned(),
            },
        )
    }

    /// The comma-separated options field.
    #[must_use]
    pub fn options(&self) -> String {
        self.render_options(false)
    }

    /// The full mount table line, without trailing newline.
    #[must_use]
    pub fn line(&self) -> String {
        self.render_line(false)
    }

    /// The line with the password masked, for display.
    #[must_use]
    pub fn redacted_line(&self) -> String {
        self.render_line(true)
    }

    fn render_line(&self, redact: bool) -> String {
        format!(
            "{} {} {CIFS_FSTYPE} {} 0 0",
            self.remote,
            self.local.display(),
            self.render_options(redact)
        )
    }

    fn render_options(&self, redact: bool) -> String {
        let mut opts = format!(
            "{CIFS_BASE_OPTIONS},uid={HOST_MAPPED_UID},gid={HOST_MAPPED_GID},\
             dir_mode={},file_mode={}",
            self.dir_mode, self.file_mode
        );
        match &self.credentials {
            CredentialSource::Inline { username, password } => {
                let password = if redact { "***" } else { password.as_str() };
                let _ = write!(opts, ",username={username},password={password}");
            }
            CredentialSource::File(path) => {
                let _ = write!(opts, ",credentials={}", path.display());
            }
        }
        opts
    }
}

/// Whether `content` already has an active line for `remote` on `local`.
///
/// Comment lines are ignored; only the first two fields are compared.
#[must_use]
pub fn contains_entry(content: &str, remote: &str, local: &Path) -> bool {
    let local = local.to_string_lossy();
    content.lines().any(|line| {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            return false;
        }
        let mut fields = trimmed.split_whitespace();
        fields.next() == Some(remote) && fields.next() == Some(local.as_ref())
    })
}

/// Result of [`ensure_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The line was appended; the previous table was saved to `backup`.
    Added {
        /// Backup of the table before the edit, if it existed.
        backup: Option<PathBuf>,
    },
    /// A line for the pair already existed; nothing was written.
    AlreadyPresent,
}

/// Appends `entry` to the mount table at `fstab` unless a line for the same
/// (remote, local) pair exists. The edit runs under the lock at `lock_path`
/// and replaces the file atomically.
///
/// # Errors
///
/// Returns an error if the lock cannot be taken or the table cannot be read,
/// backed up, or written.
pub fn ensure_entry(fstab: &Path, lock_path: &Path, entry: &MountEntry) -> Result<EnsureOutcome> {
    let _lock = EditLock::acquire(lock_path, Duration::from_millis(LOCK_TIMEOUT_MS))?;

    let content = filesystem::read_optional(fstab)?.unwrap_or_default();
    if contains_entry(&content, &entry.remote, &entry.local) {
        tracing::info!(
            remote = %entry.remote,
            local = %entry.local.display(),
            "mount table entry already present"
        );
        return Ok(EnsureOutcome::AlreadyPresent);
    }

    let backup = backup::backup_file(fstab)?;
    let updated = filesystem::append_line(&content, &entry.line());
    atomic::replace_file(fstab, &updated)?;
    tracing::info!(
        remote = %entry.remote,
        local = %entry.local.display(),
        fstab = %fstab.display(),
        "mount table entry added"
    );
    Ok(EnsureOutcome::Added { backup })
}
