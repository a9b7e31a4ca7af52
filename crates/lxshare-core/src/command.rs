//! External command execution.

use std::ffi::OsStr;
use std::process::Command;

use lxshare_common::error::{LxshareError, Result};

/// Captured result of an external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code, `-1` when killed by a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Renders a command line for logs and error messages.
#[must_use]
pub fn render<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_owned();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.as_ref().to_string_lossy());
    }
    line
}

/// Runs `program` with `args` and captures its output without judging the
/// exit status.
///
/// # Errors
///
/// Returns [`LxshareError::CommandFailed`] only if the process cannot be
/// spawned.
pub fn run_unchecked<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<CommandOutput> {
    let line = render(program, args);
    tracing::debug!(command = %line, "running command");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| LxshareError::CommandFailed {
            command: line.clone(),
            status: "not started".into(),
            stderr: e.to_string(),
        })?;

    let out = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    };
    tracing::debug!(command = %line, exit_code = out.exit_code, "command finished");
    Ok(out)
}

/// Runs `program` with `args` and requires a zero exit status.
///
/// # Errors
///
/// Returns [`LxshareError::CommandFailed`] carrying the tool's stderr if the
/// process cannot be spawned or exits non-zero.
pub fn run<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<CommandOutput> {
    let out = run_unchecked(program, args)?;
    check(&render(program, args), out)
}

/// Turns a non-zero exit into [`LxshareError::CommandFailed`].
///
/// # Errors
///
/// Returns an error when `out` did not succeed.
pub fn check(command: &str, out: CommandOutput) -> Result<CommandOutput> {
    if out.success() {
        return Ok(out);
    }
    let stderr = if out.stderr.trim().is_empty() {
        out.stdout.trim().to_owned()
    } else {
        out.stderr.trim().to_owned()
    };
    Err(LxshareError::CommandFailed {
        command: command.to_owned(),
        status: format!("exit code {}", out.exit_code),
        stderr,
    })
}
