//! Configuration loading, env substitution and lossless settings merge.
//!
//! Config files: `envsync.toml`, `envsync.yaml`, `envsync.yml` or
//! `envsync.json`, searched in the directory handed to the loader.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file text before it is parsed.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod merge;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{CONFIG_FILENAMES, data_dir, discover_and_load, find_config_file, load_config},
    merge::{lossless_merge, merge_target_config},
    schema::{
        BaseConfig, EnvSyncConfig, PluginSettings, ResolvedConfig, ResolvedTargetConfig,
        Settings, TargetConfig,
    },
};
