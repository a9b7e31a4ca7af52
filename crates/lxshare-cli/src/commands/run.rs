//! `lxshare run` — Attach the share to the container.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Args;
use lxshare_common::config::HostLayout;
use lxshare_common::constants::{DEFAULT_STOP_ATTEMPTS, DEFAULT_STOP_POLL_MS, PCT_BIN};
use lxshare_common::types::ShareConfig;
use lxshare_core::host::LinuxHost;
use lxshare_runtime::backend;
use lxshare_runtime::engine::Engine;
use lxshare_runtime::plan::{PlanOptions, build_plan};
use lxshare_runtime::wait::WaitPolicy;

use super::ShareArgs;
use crate::output;
use crate::prompt::{self, TerminalPrompt};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Share parameters.
    #[command(flatten)]
    pub share: ShareArgs,

    /// Leave the container stopped if a later step fails.
    #[arg(long)]
    pub no_resume: bool,

    /// Milliseconds between container status checks while waiting for stop.
    #[arg(long, default_value_t = DEFAULT_STOP_POLL_MS)]
    pub stop_poll_ms: u64,

    /// Status checks before giving up on the container stopping.
    #[arg(long, default_value_t = DEFAULT_STOP_ATTEMPTS)]
    pub stop_attempts: u32,
}

/// Executes the `run` command.
///
/// Checks for root, collects and validates the share parameters, then runs
/// the attachment plan. Ctrl+C aborts between steps or while waiting for
/// the container to stop, after which the container is started again.
///
/// # Errors
///
/// Returns an error if the privilege check, input validation, or any step
/// fails.
#[allow(clippy::print_stderr)]
pub fn execute(args: RunArgs, layout: HostLayout) -> anyhow::Result<()> {
    lxshare_core::privilege::ensure_root()?;

    // Must precede the prompts: the hidden prompt restores echo only when
    // the read returns.
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        eprintln!("\n  Interrupted, stopping after the current step...");
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let options = PlanOptions {
        credentials_file: args.share.credentials_file,
    };
    let input = prompt::collect_input(args.share, &mut TerminalPrompt, true, &cancel)?;
    let config = ShareConfig::from_input(input)?;

    let manager = backend::detect_manager();
    if !manager.is_available() {
        anyhow::bail!("container manager `{PCT_BIN}` not found in PATH");
    }

    let plan = build_plan(&config, &layout, options)?;
    let host = LinuxHost::new();
    let engine = Engine::new(manager.as_ref(), &host, layout)
        .with_wait_policy(WaitPolicy {
            interval: Duration::from_millis(args.stop_poll_ms),
            max_attempts: args.stop_attempts,
        })
        .resume_on_failure(!args.no_resume)
        .with_cancel_flag(cancel);

    output::print_header(&plan);
    match engine.execute(&plan) {
        Ok(report) => {
            output::print_report(&report, &plan);
            Ok(())
        }
        Err(e) => {
            output::print_failure(&e, &plan);
            Err(anyhow::anyhow!("{e}"))
        }
    }
}
