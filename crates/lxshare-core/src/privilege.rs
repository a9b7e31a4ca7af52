//! Effective-root check.

use lxshare_common::error::{LxshareError, Result};

/// Ensures the process runs with effective UID 0.
///
/// # Errors
///
/// Returns [`LxshareError::PermissionDenied`] for any other identity.
pub fn ensure_root() -> Result<()> {
    check_euid(nix::unistd::geteuid().as_raw())
}

fn check_euid(euid: u32) -> Result<()> {
    if euid == 0 {
        tracing::debug!("running as root");
        Ok(())
    } else {
        Err(LxshareError::PermissionDenied {
            message: format!("this tool must be run as root (effective uid is {euid})"),
        })
    }
}
