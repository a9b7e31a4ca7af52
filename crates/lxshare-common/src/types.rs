//! Domain primitive types and input validators.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LxshareError, Result};

static PERMISSION_MODE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[0-7]{3,4}$").unwrap()
});

/// Identifier of a guest container as understood by the container manager.
///
/// Not checked locally; the manager rejects unknown IDs on first use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Octal permission mode as written into mount options (`0770`, `755`).
///
/// The literal digits are kept so the rendered option matches what the
/// operator typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionMode(String);

impl PermissionMode {
    /// Validates `value` against `^[0-7]{3,4}$`.
    ///
    /// # Errors
    ///
    /// Returns [`LxshareError::InvalidInput`] naming `field` when the value
    /// is not three or four octal digits.
    pub fn parse(field: &'static str, value: &str) -> Result<Self> {
        if PERMISSION_MODE.is_match(value) {
            Ok(Self(value.to_owned()))
        } else {
            Err(LxshareError::InvalidInput {
                field,
                message: format!(
                    "{value:?} is not an octal mode of 3 or 4 digits (e.g. 0770 or 755)"
                ),
            })
        }
    }

    /// Returns the mode digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses the read-only answer. Only `Y`, `y`, `N` and `n` are accepted.
///
/// # Errors
///
/// Returns [`LxshareError::InvalidInput`] for anything else, including the
/// empty string.
pub fn parse_read_only(answer: &str) -> Result<bool> {
    match answer {
        "Y" | "y" => Ok(true),
        "N" | "n" => Ok(false),
        other => Err(LxshareError::InvalidInput {
            field: "read-only answer",
            message: format!("{other:?} is not one of Y, y, N, n"),
        }),
    }
}

/// A string that must never be printed.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    /// Wraps a sensitive value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the wrapped value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Raw, unvalidated operator input as collected from flags, files, or prompts.
#[derive(Debug, Clone, Default)]
pub struct ShareInput {
    /// Name of the share folder on host and guest.
    pub folder: String,
    /// CIFS server host name or address.
    pub host: String,
    /// Share name on the server.
    pub share: String,
    /// SMB user name.
    pub username: String,
    /// SMB password.
    pub password: Secret,
    /// Target container ID.
    pub container: String,
    /// Guest user to add to the share group.
    pub guest_user: String,
    /// File permission mode.
    pub file_mode: String,
    /// Directory permission mode.
    pub dir_mode: String,
    /// Read-only answer (`Y`/`y`/`N`/`n`).
    pub read_only: String,
}

/// Validated share configuration driving the whole procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareConfig {
    /// Name of the share folder on host and guest.
    pub folder: String,
    /// CIFS server host name or address.
    pub host: String,
    /// Share name on the server.
    pub share: String,
    /// SMB user name.
    pub username: String,
    /// SMB password.
    pub password: Secret,
    /// Target container.
    pub container: ContainerId,
    /// Guest user to add to the share group.
    pub guest_user: String,
    /// Mode applied to files on the share.
    pub file_mode: PermissionMode,
    /// Mode applied to directories on the share.
    pub dir_mode: PermissionMode,
    /// Whether the guest sees the share read-only.
    pub read_only: bool,
}

impl ShareConfig {
    /// Validates raw input into a configuration.
    ///
    /// The file mode is checked before the directory mode, and both before
    /// the read-only answer, matching the order the operator is asked.
    ///
    /// # Errors
    ///
    /// Returns [`LxshareError::InvalidInput`] for the first field that fails
    /// validation.
    pub fn from_input(input: ShareInput) -> Result<Self> {
        check_folder_name(&input.folder)?;
        check_token("CIFS host", &input.host)?;
        check_token("share name", &input.share)?;
        check_single_line("SMB username", &input.username)?;
        check_single_line("SMB password", input.password.expose())?;
        check_token("container ID", &input.container)?;
        check_token("guest username", &input.guest_user)?;
        let file_mode = PermissionMode::parse("file permission mode", &input.file_mode)?;
        let dir_mode = PermissionMode::parse("directory permission mode", &input.dir_mode)?;
        let read_only = parse_read_only(&input.read_only)?;

        Ok(Self {
            folder: input.folder,
            host: input.host,
            share: input.share,
            username: input.username,
            password: input.password,
            container: ContainerId::new(input.container),
            guest_user: input.guest_user,
            file_mode,
            dir_mode,
            read_only,
        })
    }

    /// Checks that the SMB login can be embedded in the mount options.
    ///
    /// Whitespace would split the mount table line and a comma would split
    /// the option list. A credentials file has neither restriction.
    ///
    /// # Errors
    ///
    /// Returns [`LxshareError::InvalidInput`] naming the offending field.
    pub fn check_inline_credentials(&self) -> Result<()> {
        check_option_value("SMB username", &self.username)?;
        check_option_value("SMB password", self.password.expose())
    }

    /// UNC-style remote path, `//<host>/<share>`.
    #[must_use]
    pub fn remote_path(&self) -> String {
        format!("//{}/{}", self.host, self.share)
    }
}

/// Values that become whitespace-separated fields must be non-empty and
/// contain no whitespace.
fn check_token(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(LxshareError::InvalidInput {
            field,
            message: "must not be empty".into(),
        });
    }
    if value.chars().any(char::is_whitespace) {
        return Err(LxshareError::InvalidInput {
            field,
            message: format!("{value:?} must not contain whitespace"),
        });
    }
    Ok(())
}

/// The folder becomes a single path component under both mount roots.
fn check_folder_name(value: &str) -> Result<()> {
    check_token("folder name", value)?;
    if value.contains('/') || value == "." || value == ".." {
        return Err(LxshareError::InvalidInput {
            field: "folder name",
            message: format!("{value:?} must be a single path component"),
        });
    }
    Ok(())
}

fn check_option_value(field: &'static str, value: &str) -> Result<()> {
    if value.contains(|c: char| c.is_whitespace() || c == ',') {
        return Err(LxshareError::InvalidInput {
            field,
            message: "must not contain whitespace or commas in the mount table; \
                      use --credentials-file instead"
                .into(),
        });
    }
    Ok(())
}

fn check_single_line(field: &'static str, value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(LxshareError::InvalidInput {
            field,
            message: "must not contain line breaks".into(),
        });
    }
    Ok(())
}
