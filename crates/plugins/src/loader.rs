//! Plugin loading by name.
//!
//! The resolver only knows the [`PluginLoader`] trait. The stock
//! implementation is [`PluginRegistry`], an explicit value mapping plugin
//! names to factories; callers build one per sync run and pass it in.

use std::{collections::HashMap, sync::Arc};

use {async_trait::async_trait, tracing::debug};

use crate::{
    bundled,
    definition::PluginDefinition,
    error::{Error, Result},
};

/// Prefix plugin packages are conventionally published under.
pub const PLUGIN_PREFIX: &str = "envsync-plugin-";

/// Loads plugin definitions by name.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    /// Return the named plugin, `None` if no such plugin exists.
    async fn load(&self, name: &str) -> anyhow::Result<Option<Arc<PluginDefinition>>>;

    /// The key two spellings of the same plugin share. Resolution dedups on it.
    fn canonical_name(&self, name: &str) -> anyhow::Result<String> {
        Ok(name.to_string())
    }
}

/// Canonical registry key for a plugin name.
///
/// `envsync-plugin-travis` and `travis` name the same plugin. Names that look
/// like paths are rejected: plugins are never looked up on disk.
pub fn normalize_plugin_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_plugin_name(name, "expected a non-empty name"));
    }
    if trimmed.starts_with('.') || trimmed.contains(['/', '\\']) {
        return Err(Error::invalid_plugin_name(name, "plugin names cannot be paths"));
    }

    let normalized = trimmed.strip_prefix(PLUGIN_PREFIX).unwrap_or(trimmed);
    if normalized.is_empty() {
        return Err(Error::invalid_plugin_name(name, "expected a name after the prefix"));
    }
    Ok(normalized.to_string())
}

pub(crate) type Factory = Arc<dyn Fn() -> PluginDefinition + Send + Sync>;

/// In-memory plugin registry.
///
/// Definitions are built from their factory each time they are loaded, so a
/// registry can be shared between runs while every run gets its own
/// definitions.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: HashMap<String, Factory>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the bundled plugins.
    pub fn with_bundled() -> Self {
        let mut registry = Self::new();
        for (name, factory) in bundled::factories() {
            registry.factories.insert(name.to_string(), factory);
        }
        registry
    }

    /// Register a factory under `name`.
    ///
    /// # Errors
    ///
    /// Fails for invalid names and for names that are already registered.
    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn() -> PluginDefinition + Send + Sync + 'static,
    ) -> Result<()> {
        let key = normalize_plugin_name(name)?;
        if self.factories.contains_key(&key) {
            return Err(Error::AlreadyRegistered { name: key });
        }
        self.factories.insert(key, Arc::new(factory));
        Ok(())
    }

    /// Register a fixed definition under its own name.
    pub fn register_definition(&mut self, definition: PluginDefinition) -> Result<()> {
        let name = definition.name().to_string();
        self.register(&name, move || definition.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        normalize_plugin_name(name).is_ok_and(|key| self.factories.contains_key(&key))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[async_trait]
impl PluginLoader for PluginRegistry {
    async fn load(&self, name: &str) -> anyhow::Result<Option<Arc<PluginDefinition>>> {
        let key = normalize_plugin_name(name)?;
        let Some(factory) = self.factories.get(&key) else {
            debug!(plugin = %key, "plugin not registered");
            return Ok(None);
        };
        debug!(plugin = %key, "loading plugin");
        Ok(Some(Arc::new(factory())))
    }

    fn canonical_name(&self, name: &str) -> anyhow::Result<String> {
        Ok(normalize_plugin_name(name)?)
    }
}
