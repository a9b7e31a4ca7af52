//! System-wide constants and default paths.

/// Name of the group created inside the guest to own shared files.
pub const SHARE_GROUP: &str = "lxc_shares";

/// Fixed GID of [`SHARE_GROUP`] inside the guest.
pub const SHARE_GID: u32 = 10_000;

/// Host-side UID the share is mounted as (guest root after subuid mapping).
pub const HOST_MAPPED_UID: u32 = 100_000;

/// Host-side GID the share is mounted as ([`SHARE_GID`] after subgid mapping).
pub const HOST_MAPPED_GID: u32 = 110_000;

/// Filesystem type written into the mount table.
pub const CIFS_FSTYPE: &str = "cifs";

/// Mount options that precede the ownership and permission options.
pub const CIFS_BASE_OPTIONS: &str = "_netdev,x-systemd.automount,noatime,nobrl";

/// Host directory under which every share gets its mount point.
pub const DEFAULT_MOUNT_ROOT: &str = "/mnt/lxc_shares";

/// Guest directory under which every share is exposed.
pub const DEFAULT_GUEST_MOUNT_ROOT: &str = "/mnt";

/// Host persistent mount table.
pub const DEFAULT_FSTAB: &str = "/etc/fstab";

/// Directory holding one `<id>.conf` file per container.
pub const DEFAULT_LXC_CONFIG_DIR: &str = "/etc/pve/lxc";

/// Directory for advisory lock files.
pub const DEFAULT_LOCK_DIR: &str = "/run/lock";

/// Directory for CIFS credentials files.
pub const DEFAULT_CREDENTIALS_DIR: &str = "/etc/lxshare/credentials";

/// Exact status line the container manager prints for a stopped container.
pub const STOPPED_STATUS: &str = "status: stopped";

/// Default delay between two container status polls, in milliseconds.
pub const DEFAULT_STOP_POLL_MS: u64 = 1_000;

/// Default number of status polls before giving up on a stop.
pub const DEFAULT_STOP_ATTEMPTS: u32 = 120;

/// How long to wait for an advisory file lock, in milliseconds.
pub const LOCK_TIMEOUT_MS: u64 = 10_000;

/// Delay between two lock attempts, in milliseconds.
pub const LOCK_POLL_MS: u64 = 50;

/// Name of the lock guarding mount table edits.
pub const FSTAB_LOCK_NAME: &str = "lxshare-fstab.lock";

/// Container manager executable.
pub const PCT_BIN: &str = "pct";

/// Environment variable consulted for the SMB password.
pub const PASSWORD_ENV: &str = "LXSHARE_SMB_PASSWORD";

/// Application name used in lock and backup file names.
pub const APP_NAME: &str = "lxshare";
