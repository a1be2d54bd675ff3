//! Dependency resolution: requested plugin names in, execution order out.
//!
//! Requested names are expanded depth-first. Every distinct plugin is loaded
//! at most once, whichever spelling names it, transitive dependencies are pulled in even when not
//! requested directly, and the result lists each plugin after all of the
//! dependencies that were loaded.

use std::{collections::HashSet, sync::Arc};

use {
    envsync_common::Reference,
    futures::future::BoxFuture,
    tracing::{debug, info},
};

use crate::{
    capability::SecretStore,
    definition::PluginDefinition,
    error::{Error, Result},
    loader::PluginLoader,
    topo::Topo,
};

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Optional references that cannot be loaded become placeholders instead
    /// of missing-plugin errors.
    pub allow_optional: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            allow_optional: true,
        }
    }
}

/// One slot of a resolved plugin list.
#[derive(Debug, Clone)]
pub enum ResolvedPlugin {
    Loaded(Arc<PluginDefinition>),
    /// Placeholder for an optional plugin that could not be loaded.
    Unavailable { name: String },
}

impl ResolvedPlugin {
    pub fn name(&self) -> &str {
        match self {
            Self::Loaded(plugin) => plugin.name(),
            Self::Unavailable { name } => name,
        }
    }

    pub fn plugin(&self) -> Option<&Arc<PluginDefinition>> {
        match self {
            Self::Loaded(plugin) => Some(plugin),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Plugins in execution order: dependencies before dependents.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPluginSet {
    entries: Vec<ResolvedPlugin>,
}

impl ResolvedPluginSet {
    pub fn entries(&self) -> &[ResolvedPlugin] {
        &self.entries
    }

    /// Loaded plugins only, placeholders skipped.
    pub fn plugins(&self) -> impl Iterator<Item = &Arc<PluginDefinition>> {
        self.entries.iter().filter_map(ResolvedPlugin::plugin)
    }

    /// Plugins exposing a secret store, in resolution order.
    pub fn secret_stores(&self) -> impl Iterator<Item = (&Arc<PluginDefinition>, &Arc<dyn SecretStore>)> {
        self.plugins()
            .filter_map(|plugin| plugin.secret_store().map(|store| (plugin, store)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(ResolvedPlugin::name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PluginDefinition>> {
        self.plugins().find(|plugin| plugin.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ResolvedPlugin> for ResolvedPluginSet {
    fn from_iter<I: IntoIterator<Item = ResolvedPlugin>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Arc<PluginDefinition>> for ResolvedPluginSet {
    fn from_iter<I: IntoIterator<Item = Arc<PluginDefinition>>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(ResolvedPlugin::Loaded).collect(),
        }
    }
}

impl FromIterator<PluginDefinition> for ResolvedPluginSet {
    fn from_iter<I: IntoIterator<Item = PluginDefinition>>(iter: I) -> Self {
        iter.into_iter().map(Arc::new).collect()
    }
}

/// Resolve `names` into an execution order, loading plugins through `loader`.
///
/// # Errors
///
/// - [`Error::InvalidInput`] for an empty plugin name.
/// - [`Error::PluginLoad`] when the loader fails for a plugin.
/// - [`Error::PluginAdd`] when a plugin's dependencies form a cycle.
/// - [`Error::MissingPlugins`] listing every plugin the loader did not know.
pub async fn resolve_plugins(
    names: &[Reference],
    loader: &dyn PluginLoader,
    options: ResolveOptions,
) -> Result<ResolvedPluginSet> {
    validate(names)?;

    let mut resolution = Resolution {
        loader,
        options,
        visited: HashSet::new(),
        missing: Vec::new(),
        order: Topo::new(),
    };
    resolution.expand(names).await?;

    if !resolution.missing.is_empty() {
        return Err(Error::MissingPlugins {
            names: resolution.missing,
        });
    }

    let entries = resolution.order.into_sorted();
    info!(count = entries.len(), "plugins resolved");
    Ok(ResolvedPluginSet { entries })
}

fn validate(names: &[Reference]) -> Result<()> {
    match names.iter().position(|reference| reference.name().trim().is_empty()) {
        Some(index) => Err(Error::invalid_input(format!(
            "expected plugin names to be non-empty strings, got an empty name at position {index}"
        ))),
        None => Ok(()),
    }
}

struct Resolution<'l> {
    loader: &'l dyn PluginLoader,
    options: ResolveOptions,
    visited: HashSet<String>,
    missing: Vec<String>,
    order: Topo<ResolvedPlugin>,
}

impl Resolution<'_> {
    fn expand<'a>(&'a mut self, references: &'a [Reference]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for reference in references {
                let name = self.canonical(reference.name())?;
                let name = name.as_str();
                if !self.visited.insert(name.to_string()) {
                    continue;
                }

                let loaded = self
                    .loader
                    .load(name)
                    .await
                    .map_err(|source| Error::PluginLoad {
                        name: name.to_string(),
                        source,
                    })?;

                let Some(plugin) = loaded else {
                    if reference.is_optional() && self.options.allow_optional {
                        debug!(plugin = name, "optional plugin unavailable");
                        self.add(ResolvedPlugin::Unavailable { name: name.to_string() }, name, Vec::new())?;
                    } else {
                        debug!(plugin = name, "plugin missing");
                        self.missing.push(name.to_string());
                    }
                    continue;
                };

                validate(plugin.dependencies())?;
                let after = plugin
                    .dependencies()
                    .iter()
                    .map(|dependency| self.canonical(dependency.name()))
                    .collect::<Result<Vec<_>>>()?;
                self.add(ResolvedPlugin::Loaded(Arc::clone(&plugin)), name, after)?;

                self.expand(plugin.dependencies()).await?;
            }
            Ok(())
        })
    }

    fn canonical(&self, name: &str) -> Result<String> {
        self.loader
            .canonical_name(name)
            .map_err(|source| Error::PluginLoad {
                name: name.to_string(),
                source,
            })
    }

    fn add(&mut self, entry: ResolvedPlugin, name: &str, after: Vec<String>) -> Result<()> {
        self.order
            .add(entry, name, after)
            .map_err(|_| Error::PluginAdd {
                name: name.to_string(),
            })
    }
}
