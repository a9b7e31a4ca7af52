//! Proxmox `pct` container manager backend.

use lxshare_common::constants::PCT_BIN;
use lxshare_common::error::Result;
use lxshare_common::types::ContainerId;
use lxshare_core::command::{self, CommandOutput};

use super::ContainerManager;

/// Backend driving LXC guests through the `pct` tool.
#[derive(Debug, Clone)]
pub struct PctManager {
    program: String,
}

impl PctManager {
    /// Creates a backend using `pct` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(PCT_BIN)
    }

    /// Creates a backend using a specific executable.
    #[must_use]
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PctManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips trailing newlines the way a shell command substitution does.
fn status_line(stdout: &str) -> String {
    stdout.trim_end_matches(['\n', '\r']).to_owned()
}

impl ContainerManager for PctManager {
    fn exec(&self, id: &ContainerId, cmd: &[&str]) -> Result<CommandOutput> {
        tracing::debug!(id = %id, cmd = ?cmd, "exec in container");
        let mut args = vec!["exec", id.as_str(), "--"];
        args.extend_from_slice(cmd);
        command::run_unchecked(&self.program, &args)
    }

    fn stop(&self, id: &ContainerId) -> Result<()> {
        tracing::info!(id = %id, "stopping container");
        let _ = command::run(&self.program, &["stop", id.as_str()])?;
        Ok(())
    }

    fn status(&self, id: &ContainerId) -> Result<String> {
        let out = command::run(&self.program, &["status", id.as_str()])?;
        Ok(status_line(&out.stdout))
    }

    fn start(&self, id: &ContainerId) -> Result<()> {
        tracing::info!(id = %id, "starting container");
        let _ = command::run(&self.program, &["start", id.as_str()])?;
        Ok(())
    }

    fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }
}
