//! # lxshare-core
//!
//! Host-side primitives for attaching a CIFS share to a container host:
//! - **Commands**: running external tools and capturing their output.
//! - **Privilege**: the effective-root check.
//! - **Host**: mount point creation, mount/unmount, init system reload.
//! - **Filesystem**: advisory locks and atomic replace-by-rename edits.
//! - **Mount table / container config**: the two text files the
//!   procedure appends to, edited transactionally.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod command;
pub mod credentials;
pub mod filesystem;
pub mod fstab;
pub mod host;
pub mod lxc_config;
pub mod privilege;
