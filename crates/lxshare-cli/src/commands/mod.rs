//! CLI command definitions and dispatch.

pub mod plan;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lxshare_common::config::HostLayout;
use lxshare_common::constants::{
    DEFAULT_CREDENTIALS_DIR, DEFAULT_FSTAB, DEFAULT_LOCK_DIR, DEFAULT_LXC_CONFIG_DIR,
    PASSWORD_ENV,
};

/// lxshare — attach a CIFS share to an LXC guest.
#[derive(Parser, Debug)]
#[command(name = "lxshare", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Host mount table.
    #[arg(long, global = true, hide = true, default_value = DEFAULT_FSTAB)]
    pub fstab: PathBuf,

    /// Directory of container configuration files.
    #[arg(long, global = true, hide = true, default_value = DEFAULT_LXC_CONFIG_DIR)]
    pub lxc_config_dir: PathBuf,

    /// Directory for lock files.
    #[arg(long, global = true, hide = true, default_value = DEFAULT_LOCK_DIR)]
    pub lock_dir: PathBuf,

    /// Directory for CIFS credentials files.
    #[arg(long, global = true, hide = true, default_value = DEFAULT_CREDENTIALS_DIR)]
    pub credentials_dir: PathBuf,
}

impl Cli {
    /// Host layout with the overrides applied.
    #[must_use]
    pub fn layout(&self) -> HostLayout {
        HostLayout {
            fstab: self.fstab.clone(),
            lxc_config_dir: self.lxc_config_dir.clone(),
            lock_dir: self.lock_dir.clone(),
            credentials_dir: self.credentials_dir.clone(),
            ..HostLayout::default()
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Attach the share: provision the guest, mount on the host, bind into the container.
    Run(run::RunArgs),
    /// Show the steps `run` would perform without changing anything.
    Plan(plan::PlanArgs),
}

/// Share parameters. Anything not given here, in the environment, or in
/// the share file is asked for interactively.
#[derive(Args, Debug, Clone, Default)]
pub struct ShareArgs {
    /// YAML file with share parameters.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Folder name used for the host and guest mount points.
    #[arg(long)]
    pub folder: Option<String>,

    /// CIFS server host name or address.
    #[arg(long)]
    pub host: Option<String>,

    /// Share name on the server.
    #[arg(long)]
    pub share: Option<String>,

    /// SMB user name.
    #[arg(long)]
    pub username: Option<String>,

    /// SMB password. Prefer the environment variable over the flag.
    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    pub password: Option<String>,

    /// Container ID.
    #[arg(long)]
    pub container: Option<String>,

    /// Guest user to add to the share group.
    #[arg(long)]
    pub guest_user: Option<String>,

    /// File permission mode (3-4 octal digits).
    #[arg(long)]
    pub file_mode: Option<String>,

    /// Directory permission mode (3-4 octal digits).
    #[arg(long)]
    pub dir_mode: Option<String>,

    /// Expose the share read-only in the guest (Y/n).
    #[arg(long, value_name = "Y|N")]
    pub read_only: Option<String>,

    /// Store the SMB login in a root-only credentials file instead of the mount table.
    #[arg(long)]
    pub credentials_file: bool,
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let layout = cli.layout();
    match cli.command {
        Command::Run(args) => run::execute(args, layout),
        Command::Plan(args) => plan::execute(args, &layout),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn layout_overrides_apply() {
        let cli = Cli::parse_from([
            "lxshare",
            "--fstab",
            "/tmp/fstab",
            "plan",
            "--folder",
            "media",
        ]);
        let layout = cli.layout();
        assert_eq!(layout.fstab, PathBuf::from("/tmp/fstab"));
        assert_eq!(layout.lxc_config_dir, PathBuf::from("/etc/pve/lxc"));
        assert_eq!(layout.mount_root, PathBuf::from("/mnt/lxc_shares"));
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from([
            "lxshare",
            "run",
            "--container",
            "105",
            "--read-only",
            "Y",
            "--no-resume",
            "--stop-attempts",
            "10",
        ]);
        let Command::Run(args) = cli.command else {
            unreachable!("parsed a run command");
        };
        assert_eq!(args.share.container.as_deref(), Some("105"));
        assert_eq!(args.share.read_only.as_deref(), Some("Y"));
        assert!(args.no_resume);
        assert_eq!(args.stop_attempts, 10);
    }
}
