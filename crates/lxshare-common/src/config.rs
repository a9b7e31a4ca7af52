//! Configuration models: host filesystem layout and the YAML share file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{LxshareError, Result};
use crate::types::ContainerId;

/// Filesystem locations the procedure reads and writes on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostLayout {
    /// Persistent mount table.
    pub fstab: PathBuf,
    /// Directory holding `<id>.conf` container configurations.
    pub lxc_config_dir: PathBuf,
    /// Host directory under which share mount points are created.
    pub mount_root: PathBuf,
    /// Guest directory under which shares are exposed.
    pub guest_mount_root: PathBuf,
    /// Directory for advisory lock files.
    pub lock_dir: PathBuf,
    /// Directory for CIFS credentials files.
    pub credentials_dir: PathBuf,
}

impl Default for HostLayout {
    fn default() -> Self {
        Self {
            fstab: PathBuf::from(constants::DEFAULT_FSTAB),
            lxc_config_dir: PathBuf::from(constants::DEFAULT_LXC_CONFIG_DIR),
            mount_root: PathBuf::from(constants::DEFAULT_MOUNT_ROOT),
            guest_mount_root: PathBuf::from(constants::DEFAULT_GUEST_MOUNT_ROOT),
            lock_dir: PathBuf::from(constants::DEFAULT_LOCK_DIR),
            credentials_dir: PathBuf::from(constants::DEFAULT_CREDENTIALS_DIR),
        }
    }
}

impl HostLayout {
    /// Host mount point for a share folder.
    #[must_use]
    pub fn host_mount_path(&self, folder: &str) -> PathBuf {
        self.mount_root.join(folder)
    }

    /// Guest mount point for a share folder.
    #[must_use]
    pub fn guest_mount_path(&self, folder: &str) -> PathBuf {
        self.guest_mount_root.join(folder)
    }

    /// Configuration file of a container.
    #[must_use]
    pub fn container_config(&self, container: &ContainerId) -> PathBuf {
        self.lxc_config_dir.join(format!("{container}.conf"))
    }

    /// Lock file serializing runs against one container.
    #[must_use]
    pub fn container_lock(&self, container: &ContainerId) -> PathBuf {
        self.lock_dir
            .join(format!("{}-{container}.lock", constants::APP_NAME))
    }

    /// Lock file serializing mount table edits.
    #[must_use]
    pub fn fstab_lock(&self) -> PathBuf {
        self.lock_dir.join(constants::FSTAB_LOCK_NAME)
    }

    /// Credentials file for a share folder.
    #[must_use]
    pub fn credentials_file(&self, folder: &str) -> PathBuf {
        self.credentials_dir.join(format!("{folder}.cred"))
    }
}

/// Read-only setting in a share file: either a YAML boolean or an answer
/// letter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ReadOnlySetting {
    /// `read_only: true`
    Flag(bool),
    /// `read_only: "Y"`
    Answer(String),
}

impl ReadOnlySetting {
    /// Normalizes to the interactive answer form so one validator applies.
    #[must_use]
    pub fn into_answer(self) -> String {
        match self {
            Self::Flag(true) => "Y".into(),
            Self::Flag(false) => "N".into(),
            Self::Answer(a) => a,
        }
    }
}

/// Share description loaded from YAML. Every field is optional; missing
/// ones are prompted for.
///
/// Permission modes must be quoted (`"0770"`), otherwise YAML reads them
/// as decimal integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareFile {
    /// Share folder name.
    pub folder: Option<String>,
    /// CIFS server.
    pub host: Option<String>,
    /// Share name on the server.
    pub share: Option<String>,
    /// SMB user name.
    pub username: Option<String>,
    /// SMB password.
    pub password: Option<String>,
    /// Container ID.
    pub container: Option<String>,
    /// Guest user name.
    pub guest_user: Option<String>,
    /// File permission mode.
    pub file_mode: Option<String>,
    /// Directory permission mode.
    pub dir_mode: Option<String>,
    /// Read-only setting.
    pub read_only: Option<ReadOnlySetting>,
}

impl ShareFile {
    /// Parses a share file from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid share document.
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|source| LxshareError::Yaml {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads a share file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| LxshareError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }
}
