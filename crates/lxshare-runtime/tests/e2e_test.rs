//! End-to-end tests for the share attachment procedure.
//!
//! The engine runs against in-memory fakes of the container manager and
//! the host mount tools, while the mount table, container configuration,
//! locks, and credentials are real files in a temporary directory.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use lxshare_common::config::HostLayout;
use lxshare_common::error::{LxshareError, Result};
use lxshare_common::types::{ContainerId, Secret, ShareConfig, ShareInput};
use lxshare_core::command::CommandOutput;
use lxshare_core::fstab::EnsureOutcome;
use lxshare_core::host::HostSystem;
use lxshare_runtime::backend::ContainerManager;
use lxshare_runtime::engine::Engine;
use lxshare_runtime::plan::{PlanOptions, Step, build_plan};
use lxshare_runtime::provision::GroupOutcome;
use lxshare_runtime::wait::WaitPolicy;

const MEDIA_LINE: &str = "//NAS/media /mnt/lxc_shares/media cifs _netdev,x-systemd.automount,noatime,nobrl,uid=100000,gid=110000,dir_mode=0770,file_mode=0770,username=smbuser,password=s3cret 0 0";

// ── Fakes ────────────────────────────────────────────────────────────

struct FakeManager {
    calls: RefCell<Vec<String>>,
    statuses: RefCell<VecDeque<String>>,
    group_exists: Cell<bool>,
    usermod_exit: i32,
    start_fails: bool,
}

impl FakeManager {
    fn new() -> Self {
        Self {
            calls: RefCell::default(),
            statuses: RefCell::new(VecDeque::from(vec![
                "status: running".to_owned(),
                "status: stopped".to_owned(),
            ])),
            group_exists: Cell::new(false),
            usermod_exit: 0,
            start_fails: false,
        }
    }

    fn never_stops(self) -> Self {
        *self.statuses.borrow_mut() = VecDeque::from(vec!["status: running".to_owned()]);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ContainerManager for FakeManager {
    fn exec(&self, id: &ContainerId, cmd: &[&str]) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(format!("exec {id} {}", cmd.join(" ")));
        let exit_code = match cmd.first().copied() {
            Some("getent") => i32::from(!self.group_exists.get()) * 2,
            Some("groupadd") => {
                self.group_exists.set(true);
                0
            }
            Some("usermod") => self.usermod_exit,
            _ => 0,
        };
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                "usermod: user 'ghost' does not exist".into()
            },
            exit_code,
        })
    }

    fn stop(&self, id: &ContainerId) -> Result<()> {
        self.calls.borrow_mut().push(format!("stop {id}"));
        Ok(())
    }

    fn status(&self, id: &ContainerId) -> Result<String> {
        self.calls.borrow_mut().push(format!("status {id}"));
        let mut statuses = self.statuses.borrow_mut();
        let status = if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().cloned().unwrap()
        };
        Ok(status)
    }

    fn start(&self, id: &ContainerId) -> Result<()> {
        self.calls.borrow_mut().push(format!("start {id}"));
        if self.start_fails {
            return Err(LxshareError::CommandFailed {
                command: format!("pct start {id}"),
                status: "exit code 255".into(),
                stderr: "startup for container failed".into(),
            });
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct FakeHost {
    calls: RefCell<Vec<String>>,
    mounted: Cell<bool>,
    mount_fails: bool,
}

impl FakeHost {
    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl HostSystem for FakeHost {
    fn create_mount_dir(&self, path: &Path) -> Result<()> {
        self.calls.borrow_mut().push(format!("mkdir {}", path.display()));
        Ok(())
    }

    fn is_mountpoint(&self, path: &Path) -> Result<bool> {
        self.calls.borrow_mut().push(format!("mountpoint {}", path.display()));
        Ok(self.mounted.get())
    }

    fn lazy_unmount(&self, path: &Path) -> Result<()> {
        self.calls.borrow_mut().push(format!("umount -l {}", path.display()));
        self.mounted.set(false);
        Ok(())
    }

    fn mount(&self, path: &Path) -> Result<()> {
        self.calls.borrow_mut().push(format!("mount {}", path.display()));
        if self.mount_fails {
            return Err(LxshareError::CommandFailed {
                command: format!("mount {}", path.display()),
                status: "exit code 32".into(),
                stderr: "mount error(13): Permission denied".into(),
            });
        }
        self.mounted.set(true);
        Ok(())
    }

    fn daemon_reload(&self) -> Result<()> {
        self.calls.borrow_mut().push("systemctl daemon-reload".into());
        Ok(())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

struct Sandbox {
    _dir: tempfile::TempDir,
    layout: HostLayout,
}

impl Sandbox {
    /// Files live in a temp dir; mount points keep their system paths
    /// since only the fake host touches them.
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("lxc")).unwrap();
        std::fs::write(root.join("fstab"), "proc /proc proc defaults 0 0\n").unwrap();
        let layout = HostLayout {
            fstab: root.join("fstab"),
            lxc_config_dir: root.join("lxc"),
            lock_dir: root.join("lock"),
            credentials_dir: root.join("credentials"),
            ..HostLayout::default()
        };
        Self { _dir: dir, layout }
    }

    fn container_config(&self) -> PathBuf {
        self.layout.lxc_config_dir.join("105.conf")
    }

    fn write_container_config(&self, content: &str) {
        std::fs::write(self.container_config(), content).unwrap();
    }

    fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }
}

fn media_config(read_only: &str) -> ShareConfig {
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
    .expect("valid config")
}

fn fast_wait() -> WaitPolicy {
    WaitPolicy {
        interval: Duration::from_millis(1),
        max_attempts: 5,
    }
}

const BASE_CONF: &str = "arch: amd64\nhostname: media\nmp0: /srv/a,mp=/a\nmp1: /srv/b,mp=/b\n";

// ── Happy path ───────────────────────────────────────────────────────

#[test]
fn media_share_writes_exact_lines() {
    let sb = Sandbox::new();
    sb.write_container_config(BASE_CONF);
    let (manager, host) = (FakeManager::new(), FakeHost::default());

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let report = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .expect("run succeeds");

    assert_eq!(
        sb.read(&sb.layout.fstab),
        format!("proc /proc proc defaults 0 0\n{MEDIA_LINE}\n")
    );
    assert_eq!(
        sb.read(&sb.container_config()),
        format!("{BASE_CONF}mp2: /mnt/lxc_shares/media,mp=/mnt/media\n")
    );
    assert_eq!(report.bind_mount.index, 2);
    assert_eq!(report.group, GroupOutcome::Created);
    assert!(matches!(report.mount_entry, EnsureOutcome::Added { .. }));
    assert_eq!(report.stop_polls, 2);
    assert_eq!(report.completed, plan.steps);
}

#[test]
fn read_only_share_gets_ro_suffix() {
    let sb = Sandbox::new();
    sb.write_container_config(BASE_CONF);
    let (manager, host) = (FakeManager::new(), FakeHost::default());

    let plan = build_plan(&media_config("Y"), &sb.layout, PlanOptions::default()).unwrap();
    let _ = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .expect("run succeeds");

    assert!(sb
        .read(&sb.container_config())
        .ends_with("mp2: /mnt/lxc_shares/media,mp=/mnt/media:ro\n"));
}

#[test]
fn external_calls_happen_in_procedure_order() {
    let sb = Sandbox::new();
    let (manager, host) = (FakeManager::new(), FakeHost::default());

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let _ = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .expect("run succeeds");

    assert_eq!(
        manager.calls(),
        vec![
            "exec 105 getent group lxc_shares",
            "exec 105 groupadd -g 10000 lxc_shares",
            "exec 105 usermod -aG lxc_shares jellyfin",
            "stop 105",
            "status 105",
            "status 105",
            "start 105",
        ]
    );
    assert_eq!(
        host.calls(),
        vec![
            "mkdir /mnt/lxc_shares/media",
            "systemctl daemon-reload",
            "mountpoint /mnt/lxc_shares/media",
            "mount /mnt/lxc_shares/media",
        ]
    );
}

#[test]
fn missing_container_config_starts_at_index_zero() {
    let sb = Sandbox::new();
    let (manager, host) = (FakeManager::new(), FakeHost::default());

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let report = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .expect("run succeeds");

    assert_eq!(report.bind_mount.index, 0);
    assert_eq!(
        sb.read(&sb.container_config()),
        "mp0: /mnt/lxc_shares/media,mp=/mnt/media\n"
    );
}

#[test]
fn stale_mount_is_detached_before_mounting() {
    let sb = Sandbox::new();
    let manager = FakeManager::new();
    let host = FakeHost::default();
    host.mounted.set(true);

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let report = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .expect("run succeeds");

    assert!(report.unmounted_stale);
    let calls = host.calls();
    let umount = calls.iter().position(|c| c.starts_with("umount -l")).unwrap();
    let mount = calls.iter().position(|c| c.starts_with("mount ")).unwrap();
    assert!(umount < mount);
}

// ── Idempotence ──────────────────────────────────────────────────────

#[test]
fn repeated_runs_converge_to_one_mount_table_line() {
    let sb = Sandbox::new();
    sb.write_container_config(BASE_CONF);
    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();

    let mut indices = Vec::new();
    for run in 0..3 {
        let (manager, host) = (FakeManager::new(), FakeHost::default());
        manager.group_exists.set(run > 0);
        let report = Engine::new(&manager, &host, sb.layout.clone())
            .with_wait_policy(fast_wait())
            .execute(&plan)
            .expect("run succeeds");
        if run > 0 {
            assert_eq!(report.mount_entry, EnsureOutcome::AlreadyPresent);
            assert_eq!(report.group, GroupOutcome::AlreadyExists);
        }
        indices.push(report.bind_mount.index);
    }

    let fstab = sb.read(&sb.layout.fstab);
    assert_eq!(fstab.lines().filter(|l| *l == MEDIA_LINE).count(), 1);
    assert_eq!(indices, vec![2, 3, 4]);
}

// ── Failures and cleanup ─────────────────────────────────────────────

#[test]
fn mount_failure_aborts_and_restarts_container() {
    let sb = Sandbox::new();
    sb.write_container_config(BASE_CONF);
    let manager = FakeManager::new();
    let host = FakeHost {
        mount_fails: true,
        ..FakeHost::default()
    };

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let err = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .unwrap_err();

    assert_eq!(err.step, Step::Mount);
    assert!(err.to_string().contains("Permission denied"));
    assert!(!err.container_left_stopped);
    assert!(!err.completed.contains(&Step::AttachBindMount));
    assert_eq!(manager.calls().last().map(String::as_str), Some("start 105"));
    assert_eq!(sb.read(&sb.container_config()), BASE_CONF);
}

#[test]
fn no_resume_leaves_container_stopped() {
    let sb = Sandbox::new();
    let manager = FakeManager::new();
    let host = FakeHost {
        mount_fails: true,
        ..FakeHost::default()
    };

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let err = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .resume_on_failure(false)
        .execute(&plan)
        .unwrap_err();

    assert!(err.container_left_stopped);
    assert!(!manager.calls().iter().any(|c| c.starts_with("start")));
}

#[test]
fn failed_restart_is_reported_as_left_stopped() {
    let sb = Sandbox::new();
    let manager = FakeManager {
        start_fails: true,
        ..FakeManager::new()
    };
    let host = FakeHost {
        mount_fails: true,
        ..FakeHost::default()
    };

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let err = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .unwrap_err();

    assert_eq!(err.step, Step::Mount);
    assert!(err.container_left_stopped);
}

#[test]
fn stop_timeout_is_distinct_error() {
    let sb = Sandbox::new();
    let manager = FakeManager::new().never_stops();
    let host = FakeHost::default();

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let err = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .unwrap_err();

    assert_eq!(err.step, Step::WaitForStop);
    assert!(matches!(err.source, LxshareError::StopTimeout { .. }));
    let statuses = manager.calls().iter().filter(|c| c.starts_with("status")).count();
    assert_eq!(statuses, 5);
    assert!(host.calls().is_empty());
    assert_eq!(sb.read(&sb.layout.fstab), "proc /proc proc defaults 0 0\n");
}

#[test]
fn guest_failure_before_stop_does_not_touch_container_state() {
    let sb = Sandbox::new();
    let manager = FakeManager {
        usermod_exit: 6,
        ..FakeManager::new()
    };
    let host = FakeHost::default();

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let err = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .unwrap_err();

    assert_eq!(err.step, Step::AddUserToGroup);
    assert!(!err.container_left_stopped);
    assert_eq!(err.completed, vec![Step::AcquireLock, Step::CreateGroup]);
    assert!(!manager.calls().iter().any(|c| c.starts_with("stop") || c.starts_with("start")));
}

#[test]
fn raised_cancel_flag_stops_before_first_step() {
    let sb = Sandbox::new();
    let (manager, host) = (FakeManager::new(), FakeHost::default());

    let plan = build_plan(&media_config("N"), &sb.layout, PlanOptions::default()).unwrap();
    let err = Engine::new(&manager, &host, sb.layout.clone())
        .with_cancel_flag(Arc::new(AtomicBool::new(true)))
        .execute(&plan)
        .unwrap_err();

    assert_eq!(err.step, Step::AcquireLock);
    assert!(matches!(err.source, LxshareError::Cancelled { .. }));
    assert!(manager.calls().is_empty());
}

// ── Credentials file ─────────────────────────────────────────────────

#[test]
fn credentials_file_keeps_password_out_of_mount_table() {
    use std::os::unix::fs::PermissionsExt;

    let sb = Sandbox::new();
    let (manager, host) = (FakeManager::new(), FakeHost::default());

    let plan = build_plan(
        &media_config("N"),
        &sb.layout,
        PlanOptions {
            credentials_file: true,
        },
    )
    .unwrap();
    let _ = Engine::new(&manager, &host, sb.layout.clone())
        .with_wait_policy(fast_wait())
        .execute(&plan)
        .expect("run succeeds");

    let fstab = sb.read(&sb.layout.fstab);
    assert!(!fstab.contains("s3cret"));
    let cred_path = sb.layout.credentials_file("media");
    assert!(fstab.contains(&format!("credentials={}", cred_path.display())));
    assert_eq!(sb.read(&cred_path), "username=smbuser\npassword=s3cret\n");
    let mode = std::fs::metadata(&cred_path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
