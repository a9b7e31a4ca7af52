//! Host mount operations.
//!
//! The procedure talks to the host through [`HostSystem`] so it can be
//! driven against a recording fake in tests.

use std::path::Path;

use lxshare_common::error::{LxshareError, Result};

use crate::command;

/// Host facilities the procedure needs besides file edits.
pub trait HostSystem {
    /// Creates the mount point and any missing parents. Succeeds if it
    /// already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_mount_dir(&self, path: &Path) -> Result<()>;

    /// Reports whether `path` is currently a mount point.
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself cannot run.
    fn is_mountpoint(&self, path: &Path) -> Result<bool>;

    /// Detaches the mount at `path` lazily.
    ///
    /// # Errors
    ///
    /// Returns an error if the unmount fails.
    fn lazy_unmount(&self, path: &Path) -> Result<()>;

    /// Mounts `path` from its mount table entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount fails.
    fn mount(&self, path: &Path) -> Result<()>;

    /// Reloads the init system's unit cache so it picks up mount table
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the reload fails.
    fn daemon_reload(&self) -> Result<()>;
}

/// [`HostSystem`] backed by the standard Linux tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxHost;

impl LinuxHost {
    /// Creates a host handle.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HostSystem for LinuxHost {
    fn create_mount_dir(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|source| LxshareError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "mount point ready");
        Ok(())
    }

    fn is_mountpoint(&self, path: &Path) -> Result<bool> {
        let out = command::run_unchecked("mountpoint", &[Path::new("-q"), path])?;
        Ok(out.success())
    }

    fn lazy_unmount(&self, path: &Path) -> Result<()> {
        let _ = command::run("umount", &[Path::new("-l"), path])?;
        Ok(())
    }

    fn mount(&self, path: &Path) -> Result<()> {
        let _ = command::run("mount", &[path])?;
        Ok(())
    }

    fn daemon_reload(&self) -> Result<()> {
        let _ = command::run("systemctl", &["daemon-reload"])?;
        Ok(())
    }
}
