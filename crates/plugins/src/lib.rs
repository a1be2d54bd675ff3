//! Plugin system: plugin definitions, capabilities, loading and ordering.
//!
//! A plugin is a named unit of work. It can depend on other plugins, need
//! secrets, describe the secrets it provides, act as a secret store and run
//! hooks globally and once per repository. Plugins are looked up through a
//! [`PluginLoader`] (usually an explicit [`PluginRegistry`]) and ordered by
//! [`resolve_plugins`] so dependencies always run before their dependents.

pub mod bundled;
pub mod capability;
pub mod definition;
pub mod error;
pub mod loader;
pub mod resolve;
pub mod target;
mod topo;

pub use {
    capability::{PluginHook, RunContext, SecretStore, SecretTester},
    definition::PluginDefinition,
    error::{Error, Result},
    loader::{PLUGIN_PREFIX, PluginLoader, PluginRegistry, normalize_plugin_name},
    resolve::{ResolveOptions, ResolvedPlugin, ResolvedPluginSet, resolve_plugins},
    target::{EnvData, SecretNeeds, SecretRequirement, SyncTarget},
};
