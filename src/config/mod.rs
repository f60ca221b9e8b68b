//! Configuration for github-push
//!
//! A single TOML file ([`SyncConfig`]) holds the GitHub token, the webhook
//! secret, the install roots and the scheduler/server settings. A missing
//! file means defaults; see [`global`] for the format.

pub mod global;

pub use global::{CONFIG_ENV, PathsConfig, SchedulerConfig, ServerConfig, SyncConfig, TOKEN_ENV, data_dir};
