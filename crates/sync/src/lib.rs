//! Sync orchestration.
//!
//! [`init_env_sync`] turns a loaded config into one [`SyncTarget`] per target
//! group. [`sync_target`] runs a target's plugin hooks, global ones first
//! and then once per repository, reporting progress as it goes.
//! [`sync_all`] fans out over every target.
//!
//! [`SyncTarget`]: envsync_plugins::SyncTarget

pub mod error;
pub mod init;
pub mod orchestrator;

pub use {
    error::{Error, Result},
    init::{EnvSyncBase, EnvSyncSetup, init_env_sync},
    orchestrator::{sync_all, sync_target},
};
