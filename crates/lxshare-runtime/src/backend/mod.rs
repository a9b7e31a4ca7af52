//! Container manager abstraction.

pub mod pct;

use lxshare_common::error::Result;
use lxshare_common::types::ContainerId;
use lxshare_core::command::{self, CommandOutput};

/// The four container manager operations the procedure uses.
///
/// Implementors shell out to the real manager; tests substitute a fake.
pub trait ContainerManager {
    /// Runs `cmd` inside the container and returns its output whatever the
    /// exit status.
    ///
    /// # Errors
    ///
    /// Returns an error only if the manager cannot be invoked.
    fn exec(&self, id: &ContainerId, cmd: &[&str]) -> Result<CommandOutput>;

    /// Requests the container to stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the manager rejects the request.
    fn stop(&self, id: &ContainerId) -> Result<()>;

    /// Returns the manager's status line for the container, e.g.
    /// `status: running`, without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be queried.
    fn status(&self, id: &ContainerId) -> Result<String>;

    /// Starts the container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    fn start(&self, id: &ContainerId) -> Result<()>;

    /// Whether the manager can be used on this host.
    fn is_available(&self) -> bool;

    /// Runs `cmd` inside the container and requires it to succeed.
    ///
    /// # Errors
    ///
    /// Returns [`lxshare_common::error::LxshareError::CommandFailed`] with
    /// the guest command's stderr if it exits non-zero.
    fn exec_checked(&self, id: &ContainerId, cmd: &[&str]) -> Result<CommandOutput> {
        let out = self.exec(id, cmd)?;
        command::check(&format!("exec {id} -- {}", cmd.join(" ")), out)
    }
}

/// Returns the container manager for this host.
#[must_use]
pub fn detect_manager() -> Box<dyn ContainerManager> {
    Box::new(pct::PctManager::new())
}
