//! Bounded wait for a container to reach the stopped state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use lxshare_common::constants::{DEFAULT_STOP_ATTEMPTS, DEFAULT_STOP_POLL_MS, STOPPED_STATUS};
use lxshare_common::error::{LxshareError, Result};
use lxshare_common::types::ContainerId;

use crate::backend::ContainerManager;

const CANCEL_CHECK: Duration = Duration::from_millis(100);

/// How often and how long to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between two status queries.
    pub interval: Duration,
    /// Status queries before giving up. At least one query is always made.
    pub max_attempts: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_STOP_POLL_MS),
            max_attempts: DEFAULT_STOP_ATTEMPTS,
        }
    }
}

/// Polls the container status until it is exactly `status: stopped`.
///
/// Returns the number of queries made.
///
/// # Errors
///
/// Returns [`LxshareError::StopTimeout`] when the attempts run out,
/// [`LxshareError::Cancelled`] when `cancel` is raised, or the status
/// query's own error.
pub fn wait_until_stopped(
    manager: &dyn ContainerManager,
    id: &ContainerId,
    policy: WaitPolicy,
    cancel: &AtomicBool,
) -> Result<u32> {
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        if cancel.load(Ordering::SeqCst) {
            return Err(LxshareError::Cancelled {
                during: "waiting for the container to stop",
            });
        }

        attempt += 1;
        let status = manager.status(id)?;
        if status == STOPPED_STATUS {
            tracing::info!(id = %id, attempts = attempt, "container stopped");
            return Ok(attempt);
        }
        tracing::debug!(id = %id, attempt, status = %status, "container not stopped yet");

        if attempt >= max_attempts {
            return Err(LxshareError::StopTimeout {
                container: id.to_string(),
                waited: started.elapsed(),
                last_status: status,
            });
        }
        sleep_unless_cancelled(policy.interval, cancel);
    }
}

fn sleep_unless_cancelled(total: Duration, cancel: &AtomicBool) {
    let deadline = Instant::now() + total;
    loop {
        let now = Instant::now();
        if now >= deadline || cancel.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(CANCEL_CHECK.min(deadline - now));
    }
}
