//! Execution engine for share attachment plans.
//!
//! Steps run strictly in order and the first failure aborts the run. When
//! the failure happens after this run stopped the container, the engine
//! tries to start it again before reporting, so a failed attachment does
//! not leave the guest down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lxshare_common::config::HostLayout;
use lxshare_common::constants::LOCK_TIMEOUT_MS;
use lxshare_common::error::{LxshareError, Result};
use lxshare_core::credentials;
use lxshare_core::filesystem::lock::EditLock;
use lxshare_core::fstab::{self, EnsureOutcome};
use lxshare_core::host::HostSystem;
use lxshare_core::lxc_config::{self, BindMount};
use thiserror::Error;

use crate::backend::ContainerManager;
use crate::plan::{Plan, Step};
use crate::provision::{self, GroupOutcome};
use crate::wait::{self, WaitPolicy};

/// A step failed and the run was aborted.
#[derive(Debug, Error)]
#[error("step `{step}` failed: {source}")]
pub struct ProcedureError {
    /// The step that failed.
    pub step: Step,
    /// Why it failed.
    pub source: LxshareError,
    /// Steps that completed before the failure.
    pub completed: Vec<Step>,
    /// Whether the container is still stopped after cleanup.
    pub container_left_stopped: bool,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Whether the share group was created or already existed.
    pub group: GroupOutcome,
    /// Status queries until the container stopped.
    pub stop_polls: u32,
    /// Whether a stale mount was detached.
    pub unmounted_stale: bool,
    /// Whether the mount table line was added or already present.
    pub mount_entry: EnsureOutcome,
    /// The bind mount written to the container configuration.
    pub bind_mount: BindMount,
    /// Every step, in order.
    pub completed: Vec<Step>,
}

#[derive(Default)]
struct RunState {
    lock: Option<EditLock>,
    stop_requested: bool,
    started: bool,
    group: Option<GroupOutcome>,
    stop_polls: u32,
    unmounted_stale: bool,
    mount_entry: Option<EnsureOutcome>,
    bind_mount: Option<BindMount>,
}

/// Runs plans against a container manager and a host.
pub struct Engine<'a> {
    manager: &'a dyn ContainerManager,
    host: &'a dyn HostSystem,
    layout: HostLayout,
    wait: WaitPolicy,
    resume_on_failure: bool,
    cancel: Arc<AtomicBool>,
}

impl<'a> Engine<'a> {
    /// Creates an engine with the default wait policy and resume-on-failure
    /// enabled.
    #[must_use]
    pub fn new(
        manager: &'a dyn ContainerManager,
        host: &'a dyn HostSystem,
        layout: HostLayout,
    ) -> Self {
        Self {
            manager,
            host,
            layout,
            wait: WaitPolicy::default(),
            resume_on_failure: true,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Overrides the stop wait policy.
    #[must_use]
    pub const fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    /// Chooses whether a failed run starts the container it stopped.
    #[must_use]
    pub const fn resume_on_failure(mut self, resume: bool) -> Self {
        self.resume_on_failure = resume;
        self
    }

    /// Shares a cancellation flag, typically raised by a Ctrl+C handler.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Executes every step of `plan` in order.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcedureError`] naming the first step that failed. If
    /// the container had been stopped by then, a restart has already been
    /// attempted unless resume-on-failure is disabled.
    pub fn execute(&self, plan: &Plan) -> std::result::Result<RunReport, ProcedureError> {
        let mut state = RunState::default();
        let mut completed = Vec::with_capacity(plan.steps.len());

        for (i, &step) in plan.steps.iter().enumerate() {
            eprintln!("  [{}/{}] {}", i + 1, plan.steps.len(), plan.describe(step));
            tracing::info!(step = %step, container = %plan.container, "running step");

            let result = if self.cancel.load(Ordering::SeqCst) {
                Err(LxshareError::Cancelled {
                    during: "running the attachment steps",
                })
            } else {
                self.run_step(step, plan, &mut state)
            };

            if let Err(source) = result {
                tracing::error!(step = %step, error = %source, "step failed");
                let container_left_stopped = self.cleanup(plan, &state);
                return Err(ProcedureError {
                    step,
                    source,
                    completed,
                    container_left_stopped,
                });
            }
            completed.push(step);
        }

        drop(state.lock.take());
        Ok(RunReport {
            group: state.group.unwrap_or(GroupOutcome::AlreadyExists),
            stop_polls: state.stop_polls,
            unmounted_stale: state.unmounted_stale,
            mount_entry: state.mount_entry.unwrap_or(EnsureOutcome::AlreadyPresent),
            bind_mount: state.bind_mount.ok_or_else(|| ProcedureError {
                step: Step::AttachBindMount,
                source: LxshareError::Config {
                    message: "plan has no bind mount step".into(),
                },
                completed: completed.clone(),
                container_left_stopped: state.stop_requested && !state.started,
            })?,
            completed,
        })
    }

    fn run_step(&self, step: Step, plan: &Plan, state: &mut RunState) -> Result<()> {
        let id = &plan.container;
        match step {
            Step::AcquireLock => {
                let lock =
                    EditLock::acquire(&plan.lock_path, Duration::from_millis(LOCK_TIMEOUT_MS))?;
                state.lock = Some(lock);
            }
            Step::CreateGroup => {
                let outcome = provision::ensure_share_group(self.manager, id)?;
                if outcome == GroupOutcome::AlreadyExists {
                    eprintln!("        group already exists, skipping");
                }
                state.group = Some(outcome);
            }
            Step::AddUserToGroup => {
                provision::add_user_to_share_group(self.manager, id, &plan.guest_user)?;
            }
            Step::StopContainer => {
                self.manager.stop(id)?;
                state.stop_requested = true;
            }
            Step::WaitForStop => {
                state.stop_polls =
                    wait::wait_until_stopped(self.manager, id, self.wait, &self.cancel)?;
            }
            Step::WriteCredentials => {
                if let Some(c) = &plan.credentials {
                    credentials::write_credentials(&c.path, &c.username, &c.password)?;
                }
            }
            Step::CreateMountDir => self.host.create_mount_dir(&plan.host_mount)?,
            Step::EnsureMountEntry => {
                let table = &self.layout.fstab;
                let outcome =
                    fstab::ensure_entry(table, &self.layout.fstab_lock(), &plan.mount_entry)?;
                if outcome == EnsureOutcome::AlreadyPresent {
                    eprintln!("        entry already present in {}, skipping", table.display());
                }
                state.mount_entry = Some(outcome);
            }
            Step::DaemonReload => self.host.daemon_reload()?,
            Step::UnmountStale => {
                if self.host.is_mountpoint(&plan.host_mount)? {
                    tracing::warn!(path = %plan.host_mount.display(), "detaching existing mount");
                    self.host.lazy_unmount(&plan.host_mount)?;
                    state.unmounted_stale = true;
                }
            }
            Step::Mount => self.host.mount(&plan.host_mount)?,
            Step::AttachBindMount => {
                let mount = lxc_config::attach_bind_mount(
                    &plan.container_config,
                    &plan.host_mount,
                    &plan.guest_mount,
                    plan.read_only,
                )?;
                eprintln!("        added {mount}");
                state.bind_mount = Some(mount);
            }
            Step::StartContainer => {
                self.manager.start(id)?;
                state.started = true;
            }
        }
        Ok(())
    }

    /// Restarts the container after a failure if this run stopped it.
    /// Returns whether the container is left stopped.
    fn cleanup(&self, plan: &Plan, state: &RunState) -> bool {
        if !state.stop_requested || state.started {
            return false;
        }
        if !self.resume_on_failure {
            tracing::warn!(container = %plan.container, "leaving container stopped");
            return true;
        }

        tracing::info!(container = %plan.container, "restarting container after failure");
        match self.manager.start(&plan.container) {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!(
                    container = %plan.container,
                    error = %e,
                    "restart after failure failed"
                );
                true
            }
        }
    }
}
