//! Guest-side group provisioning.

use lxshare_common::constants::{SHARE_GID, SHARE_GROUP};
use lxshare_common::error::Result;
use lxshare_common::types::ContainerId;

use crate::backend::ContainerManager;

/// What [`ensure_share_group`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// The group was created.
    Created,
    /// A group with that name already existed and was left alone.
    AlreadyExists,
}

/// Creates the share group with its fixed GID inside the container unless
/// a group of that name already exists.
///
/// # Errors
///
/// Returns an error if the lookup cannot run or `groupadd` fails (for
/// example because the GID is taken by another group).
pub fn ensure_share_group(
    manager: &dyn ContainerManager,
    id: &ContainerId,
) -> Result<GroupOutcome> {
    let lookup = manager.exec(id, &["getent", "group", SHARE_GROUP])?;
    if lookup.success() {
        tracing::info!(id = %id, group = SHARE_GROUP, "group already exists in guest");
        return Ok(GroupOutcome::AlreadyExists);
    }

    let gid = SHARE_GID.to_string();
    let _ = manager.exec_checked(id, &["groupadd", "-g", &gid, SHARE_GROUP])?;
    tracing::info!(id = %id, group = SHARE_GROUP, gid = SHARE_GID, "group created in guest");
    Ok(GroupOutcome::Created)
}

/// Adds `user` to the share group as a supplementary group.
///
/// # Errors
///
/// Returns an error if `usermod` fails, e.g. because the user does not
/// exist in the guest.
pub fn add_user_to_share_group(
    manager: &dyn ContainerManager,
    id: &ContainerId,
    user: &str,
) -> Result<()> {
    let _ = manager.exec_checked(id, &["usermod", "-aG", SHARE_GROUP, user])?;
    tracing::info!(id = %id, user, group = SHARE_GROUP, "guest user added to group");
    Ok(())
}
