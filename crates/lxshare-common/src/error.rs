//! Unified error types for the lxshare workspace.
//!
//! Higher-level crates wrap these variants when they need more context
//! (the runtime engine attaches the failing step, for example).

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum LxshareError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid or missing.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An operator-supplied value failed validation.
    #[error("invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending input.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// The process lacks the privileges the operation requires.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denied operation.
        message: String,
    },

    /// An external command exited unsuccessfully or could not be spawned.
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The container did not report a stopped state in time.
    #[error(
        "timeout waiting for container {container} to stop after {waited:?} \
         (last status: {last_status:?})"
    )]
    StopTimeout {
        /// Container that failed to stop.
        container: String,
        /// Total time spent polling.
        waited: Duration,
        /// Last status line observed.
        last_status: String,
    },

    /// The operator interrupted the run.
    #[error("interrupted while {during}")]
    Cancelled {
        /// What the procedure was doing at the time.
        during: &'static str,
    },

    /// Another process holds an advisory lock we need.
    #[error("lock busy: {path} is held by another process")]
    LockBusy {
        /// Lock file path.
        path: PathBuf,
    },

    /// A YAML share file could not be parsed.
    #[error("YAML error in {path}: {source}")]
    Yaml {
        /// File being parsed.
        path: PathBuf,
        /// Underlying parser error.
        source: serde_yaml::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, LxshareError>;
