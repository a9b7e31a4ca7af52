//! Share attachment procedure for the lxshare tool.
//!
//! Drives a container manager and the host through the ordered steps of a
//! [`plan::Plan`], with a bounded stop wait and a resume-on-failure cleanup.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod engine;
pub mod plan;
pub mod provision;
pub mod wait;
