//! Pure construction of the ordered side-effect plan.
//!
//! [`build_plan`] turns a validated [`ShareConfig`] into every value the
//! procedure will write, so the plan can be shown or inspected without
//! touching the host. Only the bind-mount index is left open; it depends on
//! the container configuration at execution time.

use std::fmt;
use std::path::PathBuf;

use lxshare_common::config::HostLayout;
use lxshare_common::constants::{SHARE_GID, SHARE_GROUP};
use lxshare_common::error::Result;
use lxshare_common::types::{ContainerId, ShareConfig};
use lxshare_core::fstab::{CredentialSource, MountEntry};
use serde::Serialize;

/// One side effect of the procedure, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    /// Take the per-container advisory lock.
    AcquireLock,
    /// Create the share group in the guest.
    CreateGroup,
    /// Add the guest user to the share group.
    AddUserToGroup,
    /// Ask the manager to stop the container.
    StopContainer,
    /// Poll until the container reports stopped.
    WaitForStop,
    /// Write the root-only credentials file.
    WriteCredentials,
    /// Create the host mount point.
    CreateMountDir,
    /// Append the mount table line if absent.
    EnsureMountEntry,
    /// Reload the init system's unit cache.
    DaemonReload,
    /// Lazily unmount a stale mount at the mount point.
    UnmountStale,
    /// Mount the share.
    Mount,
    /// Add the bind mount to the container configuration.
    AttachBindMount,
    /// Start the container again.
    StartContainer,
}

impl Step {
    /// Stable kebab-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AcquireLock => "acquire-lock",
            Self::CreateGroup => "create-group",
            Self::AddUserToGroup => "add-user-to-group",
            Self::StopContainer => "stop-container",
            Self::WaitForStop => "wait-for-stop",
            Self::WriteCredentials => "write-credentials",
            Self::CreateMountDir => "create-mount-dir",
            Self::EnsureMountEntry => "ensure-mount-entry",
            Self::DaemonReload => "daemon-reload",
            Self::UnmountStale => "unmount-stale",
            Self::Mount => "mount",
            Self::AttachBindMount => "attach-bind-mount",
            Self::StartContainer => "start-container",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options that change the shape of the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Keep the SMB login in a credentials file instead of the mount table.
    pub credentials_file: bool,
}

/// Every step and value of one procedure run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Ordered steps.
    pub steps: Vec<Step>,
    /// Target container.
    pub container: ContainerId,
    /// Guest user joining the share group.
    pub guest_user: String,
    /// Per-container lock file.
    pub lock_path: PathBuf,
    /// Host mount point.
    pub host_mount: PathBuf,
    /// Guest mount point.
    pub guest_mount: PathBuf,
    /// Mount table line to ensure.
    pub mount_entry: MountEntry,
    /// Credentials file and its login, when used.
    pub credentials: Option<CredentialsFile>,
    /// Container configuration file.
    pub container_config: PathBuf,
    /// Whether the guest sees the share read-only.
    pub read_only: bool,
}

/// Credentials file to write before the mount table is touched.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialsFile {
    /// File location.
    pub path: PathBuf,
    /// SMB user name.
    pub username: String,
    /// SMB password.
    pub password: String,
}

impl fmt::Debug for CredentialsFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsFile")
            .field("path", &self.path)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// One plan step rendered for display. Never contains the password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    /// 1-based position.
    pub index: usize,
    /// Step name.
    pub step: Step,
    /// Human-readable description of the effect.
    pub detail: String,
}

/// Builds the plan for `cfg` on a host laid out as `layout`.
///
/// # Errors
///
/// Returns an error if the login cannot be written into the mount table
/// and no credentials file was requested.
pub fn build_plan(cfg: &ShareConfig, layout: &HostLayout, options: PlanOptions) -> Result<Plan> {
    if !options.credentials_file {
        cfg.check_inline_credentials()?;
    }
    let credentials = options.credentials_file.then(|| CredentialsFile {
        path: layout.credentials_file(&cfg.folder),
        username: cfg.username.clone(),
        password: cfg.password.expose().to_owned(),
    });
    let mount_entry = match &credentials {
        Some(file) => MountEntry::for_share(cfg, layout, CredentialSource::File(file.path.clone())),
        None => MountEntry::inline(cfg, layout),
    };

    let mut steps = vec![
        Step::AcquireLock,
        Step::CreateGroup,
        Step::AddUserToGroup,
        Step::StopContainer,
        Step::WaitForStop,
    ];
    if credentials.is_some() {
        steps.push(Step::WriteCredentials);
    }
    steps.extend([
        Step::CreateMountDir,
        Step::EnsureMountEntry,
        Step::DaemonReload,
        Step::UnmountStale,
        Step::Mount,
        Step::AttachBindMount,
        Step::StartContainer,
    ]);

    Ok(Plan {
        steps,
        container: cfg.container.clone(),
        guest_user: cfg.guest_user.clone(),
        lock_path: layout.container_lock(&cfg.container),
        host_mount: layout.host_mount_path(&cfg.folder),
        guest_mount: layout.guest_mount_path(&cfg.folder),
        mount_entry,
        credentials,
        container_config: layout.container_config(&cfg.container),
        read_only: cfg.read_only,
    })
}

impl Plan {
    /// Describes what `step` will do.
    #[must_use]
    pub fn describe(&self, step: Step) -> String {
        let id = &self.container;
        match step {
            Step::AcquireLock => format!("lock {}", self.lock_path.display()),
            Step::CreateGroup => {
                format!("create group {SHARE_GROUP} (gid {SHARE_GID}) in container {id}")
            }
            Step::AddUserToGroup => {
                format!("add guest user {} to {SHARE_GROUP}", self.guest_user)
            }
            Step::StopContainer => format!("stop container {id}"),
            Step::WaitForStop => format!("wait for container {id} to report stopped"),
            Step::WriteCredentials => self.credentials.as_ref().map_or_else(String::new, |c| {
                format!("write credentials to {} (mode 0600)", c.path.display())
            }),
            Step::CreateMountDir => format!("create {}", self.host_mount.display()),
            Step::EnsureMountEntry => {
                format!("ensure mount table line: {}", self.mount_entry.redacted_line())
            }
            Step::DaemonReload => "reload init system units".to_owned(),
            Step::UnmountStale => {
                format!("lazily unmount {} if mounted", self.host_mount.display())
            }
            Step::Mount => format!("mount {}", self.host_mount.display()),
            Step::AttachBindMount => format!(
                "append mp<next>: {},mp={}{} to {}",
                self.host_mount.display(),
                self.guest_mount.display(),
                if self.read_only { ":ro" } else { "" },
                self.container_config.display()
            ),
            Step::StartContainer => format!("start container {id}"),
        }
    }

    /// All steps rendered for display.
    #[must_use]
    pub fn views(&self) -> Vec<StepView> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, &step)| StepView {
                index: i + 1,
                step,
                detail: self.describe(step),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use lxshare_common::types::{Secret, ShareInput};

    use super::*;

    fn config(read_only: &str) -> ShareConfig {
        ShareConfig::from_input(ShareInput {
            folder: "media".into(),
            host: "NAS".into(),
            share: "media".into(),
            username: "smbuser".into(),
            password: Secret::new("s3cret"),
            container: "105".into(),
            guest_user: "jellyfin".into(),
            file_mode: "0770".into(),
            dir_mode: "0770".into(),
            read_only: read_only.into(),
        })
        .expect("valid")
    }

    fn media_plan(read_only: &str) -> Plan {
        build_plan(&config(read_only), &HostLayout::default(), PlanOptions::default()).unwrap()
    }

    #[test]
    fn default_plan_has_the_twelve_operations_in_order() {
        let plan = media_plan("N");
        assert_eq!(
            plan.steps,
            vec![
                Step::AcquireLock,
                Step::CreateGroup,
                Step::AddUserToGroup,
                Step::StopContainer,
                Step::WaitForStop,
                Step::CreateMountDir,
                Step::EnsureMountEntry,
                Step::DaemonReload,
                Step::UnmountStale,
                Step::Mount,
                Step::AttachBindMount,
                Step::StartContainer,
            ]
        );
        assert!(plan.credentials.is_none());
    }

    #[test]
    fn plan_paths_follow_layout() {
        let plan = media_plan("N");
        assert_eq!(plan.host_mount, PathBuf::from("/mnt/lxc_shares/media"));
        assert_eq!(plan.guest_mount, PathBuf::from("/mnt/media"));
        assert_eq!(plan.container_config, PathBuf::from("/etc/pve/lxc/105.conf"));
        assert_eq!(
            plan.mount_entry.line(),
            "//NAS/media /mnt/lxc_shares/media cifs _netdev,x-systemd.automount,noatime,nobrl,uid=100000,gid=110000,dir_mode=0770,file_mode=0770,username=smbuser,password=s3cret 0 0"
        );
    }

    #[test]
    fn credentials_option_adds_step_before_mount_table() {
        let plan = build_plan(
            &config("N"),
            &HostLayout::default(),
            PlanOptions { credentials_file: true },
        )
        .unwrap();
        let pos = |s| plan.steps.iter().position(|&x| x == s).unwrap();
        assert!(pos(Step::WriteCredentials) < pos(Step::EnsureMountEntry));
        assert!(plan
            .mount_entry
            .line()
            .contains("credentials=/etc/lxshare/credentials/media.cred"));
    }

    #[test]
    fn inline_login_with_spaces_needs_credentials_file() {
        let mut cfg = config("N");
        cfg.password = Secret::new("correct horse, battery");
        let err = build_plan(&cfg, &HostLayout::default(), PlanOptions::default()).unwrap_err();
        assert!(err.to_string().contains("SMB password"));

        let plan = build_plan(
            &cfg,
            &HostLayout::default(),
            PlanOptions { credentials_file: true },
        )
        .unwrap();
        assert_eq!(plan.mount_entry.line().split_whitespace().count(), 6);
    }

    #[test]
    fn views_never_leak_the_password() {
        for opts in [PlanOptions::default(), PlanOptions { credentials_file: true }] {
            let plan = build_plan(&config("Y"), &HostLayout::default(), opts).unwrap();
            let json = serde_json::to_string(&plan.views()).unwrap();
            assert!(!json.contains("s3cret"), "{json}");
            assert!(!format!("{plan:?}").contains("s3cret"));
        }
    }

    #[test]
    fn read_only_shows_in_bind_mount_description() {
        let plan = media_plan("Y");
        assert!(plan.describe(Step::AttachBindMount).contains("mp=/mnt/media:ro"));
        let plan = media_plan("n");
        assert!(!plan.describe(Step::AttachBindMount).contains(":ro"));
    }

    #[test]
    fn step_views_serialize_kebab_case_names() {
        let plan = media_plan("N");
        let json = serde_json::to_value(plan.views()).unwrap();
        assert_eq!(json[0]["step"], "acquire-lock");
        assert_eq!(json[0]["index"], 1);
        assert_eq!(json[11]["step"], "start-container");
    }
}
