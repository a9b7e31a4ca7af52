//! `lxshare plan` — Show the steps `run` would perform.

use std::sync::atomic::AtomicBool;

use clap::Args;
use lxshare_common::config::HostLayout;
use lxshare_common::types::ShareConfig;
use lxshare_runtime::plan::{PlanOptions, build_plan};

use super::ShareArgs;
use crate::output;
use crate::prompt::{self, TerminalPrompt};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Share parameters.
    #[command(flatten)]
    pub share: ShareArgs,

    /// Print the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `plan` command.
///
/// Needs no privileges and changes nothing. The password is not asked for
/// and never shown.
///
/// # Errors
///
/// Returns an error if input collection or validation fails.
#[allow(clippy::print_stdout)]
pub fn execute(args: PlanArgs, layout: &HostLayout) -> anyhow::Result<()> {
    let options = PlanOptions {
        credentials_file: args.share.credentials_file,
    };
    let input =
        prompt::collect_input(args.share, &mut TerminalPrompt, false, &AtomicBool::new(false))?;
    let config = ShareConfig::from_input(input)?;
    let plan = build_plan(&config, layout, options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan.views())?);
    } else {
        print!("{}", output::format_plan(&plan));
    }
    Ok(())
}
