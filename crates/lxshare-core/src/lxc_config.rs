//! Container configuration bind-mount entries (`mp<N>: ...`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use lxshare_common::error::Result;
use regex::Regex;

use crate::filesystem::{self, atomic};

static MOUNT_POINT_KEY: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?m)^mp(\d+):").unwrap()
});

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^\[[^\]]+\]\s*$").unwrap()
});

/// Next free bind-mount index: one past the highest `mp<N>:` key anywhere
/// in `content`, or `0` when there is none.
///
/// Gaps below the highest index are never reused.
#[must_use]
pub fn next_mount_index(content: &str) -> u32 {
    MOUNT_POINT_KEY
        .captures_iter(content)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// A bind mount of a host directory into the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// `mp` index.
    pub index: u32,
    /// Host directory.
    pub host_path: PathBuf,
    /// Mount point inside the guest.
    pub guest_path: PathBuf,
    /// Whether the guest sees it read-only.
    pub read_only: bool,
}

impl fmt::Display for BindMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mp{}: {},mp={}",
            self.index,
            self.host_path.display(),
            self.guest_path.display()
        )?;
        if self.read_only {
            f.write_str(":ro")?;
        }
        Ok(())
    }
}

/// Inserts `line` at the end of the current configuration, which ends at
/// the first snapshot section header. Without sections it is appended.
#[must_use]
pub fn insert_entry(content: &str, line: &str) -> String {
    let mut offset = 0;
    for raw in content.split_inclusive('\n') {
        if SECTION_HEADER.is_match(raw.trim_end_matches(['\n', '\r'])) {
            let (head, tail) = content.split_at(offset);
            let body = head.trim_end_matches(['\n', '\r']);
            let separator = &head[body.len()..];
            let blank = separator
                .strip_prefix("\r\n")
                .or_else(|| separator.strip_prefix('\n'))
                .unwrap_or(separator);
            let mut out = filesystem::append_line(body, line);
            out.push_str(blank);
            out.push_str(tail);
            return out;
        }
        offset += raw.len();
    }
    filesystem::append_line(content, line)
}

/// Adds a bind mount to the container configuration at `path` and returns
/// it with its assigned index.
///
/// A missing file counts as empty and is created. The caller must hold the
/// container's lock so the index stays free until the write lands.
///
/// # Errors
///
/// Returns an error if the file cannot be read or replaced.
pub fn attach_bind_mount(
    path: &Path,
    host_path: &Path,
    guest_path: &Path,
    read_only: bool,
) -> Result<BindMount> {
    let content = filesystem::read_optional(path)?.unwrap_or_default();
    let mount = BindMount {
        index: next_mount_index(&content),
        host_path: host_path.to_path_buf(),
        guest_path: guest_path.to_path_buf(),
        read_only,
    };
    let updated = insert_entry(&content, &mount.to_string());
    atomic::replace_file(path, &updated)?;
    tracing::info!(config = %path.display(), entry = %mount, "bind mount added");
    Ok(mount)
}
