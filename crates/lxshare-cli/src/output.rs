//! Formatted output helpers for CLI commands.

use std::fmt::Write as _;

use lxshare_core::fstab::EnsureOutcome;
use lxshare_runtime::engine::{ProcedureError, RunReport};
use lxshare_runtime::plan::Plan;
use lxshare_runtime::provision::GroupOutcome;

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Renders the plan as a numbered list.
#[must_use]
pub fn format_plan(plan: &Plan) -> String {
    let mut out = format!("Plan for container {}\n\n", plan.container);
    for view in plan.views() {
        let _ = writeln!(out, "  {:>2}. {:<20} {}", view.index, view.step.name(), view.detail);
    }
    let _ = writeln!(out, "\n  {} step(s), nothing changed.", plan.steps.len());
    out
}

/// One-line summary of a successful run.
#[must_use]
pub fn summarize(report: &RunReport) -> String {
    let group = match report.group {
        GroupOutcome::Created => "group created",
        GroupOutcome::AlreadyExists => "group existed",
    };
    let entry = match report.mount_entry {
        EnsureOutcome::Added { .. } => "mount table entry added",
        EnsureOutcome::AlreadyPresent => "mount table entry existed",
    };
    format!("{group}, {entry}, {}", report.bind_mount)
}

/// Prints the banner naming the share and the container.
#[allow(clippy::print_stderr)]
pub fn print_header(plan: &Plan) {
    eprintln!();
    eprintln!("  {BOLD}lxshare{RESET} {DIM}v{}{RESET}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "  Attaching {} to container {}",
        plan.mount_entry.remote, plan.container
    );
    eprintln!();
}

/// Prints the outcome of a successful run and where the share is visible.
#[allow(clippy::print_stderr)]
pub fn print_report(report: &RunReport, plan: &Plan) {
    eprintln!();
    eprintln!("  {GREEN}{BOLD}Done.{RESET} {}", summarize(report));
    eprintln!(
        "  {DIM}{} is available in container {} at {}{RESET}",
        plan.host_mount.display(),
        plan.container,
        plan.guest_mount.display()
    );
    if let EnsureOutcome::Added { backup: Some(path) } = &report.mount_entry {
        eprintln!("  {DIM}Previous mount table saved to {}{RESET}", path.display());
    }
}

/// Prints the failed step, what completed before it, and a hint when the
/// container was left stopped.
#[allow(clippy::print_stderr)]
pub fn print_failure(err: &ProcedureError, plan: &Plan) {
    eprintln!();
    eprintln!(
        "  {RED}{BOLD}Failed at step {}{RESET} ({} of {} completed)",
        err.step,
        err.completed.len(),
        plan.steps.len()
    );
    if !err.completed.is_empty() {
        let done: Vec<_> = err.completed.iter().map(|s| s.name()).collect();
        eprintln!("  {DIM}Completed: {}{RESET}", done.join(", "));
    }
    if err.container_left_stopped {
        eprintln!(
            "  {YELLOW}Container {} is stopped.{RESET} Start it with: pct start {}",
            plan.container, plan.container
        );
    }
    eprintln!();
}
