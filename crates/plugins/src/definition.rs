//! The immutable description of a loaded plugin.

use std::{fmt, sync::Arc};

use envsync_common::Reference;

use crate::capability::{PluginHook, SecretStore, SecretTester};

/// A loaded plugin.
///
/// Built once by a loader and shared as `Arc<PluginDefinition>` for the rest
/// of a sync run; nothing mutates it afterwards.
///
/// ```
/// use envsync_plugins::PluginDefinition;
///
/// let travis = PluginDefinition::new("travis")
///     .depends_on("env?")
///     .needs_secret("travis")
///     .provides_secret("travis", "Provide a Travis CI API v3 token");
///
/// assert_eq!(travis.secret_description("travis"), Some("Provide a Travis CI API v3 token"));
/// assert!(travis.dependencies()[0].is_optional());
/// ```
#[derive(Clone, Default)]
pub struct PluginDefinition {
    name: String,
    dependencies: Vec<Reference>,
    secrets: Vec<Reference>,
    secret_providers: Vec<(String, String)>,
    secret_store: Option<Arc<dyn SecretStore>>,
    secret_tester: Option<Arc<dyn SecretTester>>,
    run: Option<Arc<dyn PluginHook>>,
    run_on_repo: Option<Arc<dyn PluginHook>>,
}

impl PluginDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Declare a dependency; a trailing `?` makes it optional.
    pub fn depends_on(mut self, dependency: impl Into<Reference>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Declare a secret this plugin needs; a trailing `?` makes it optional.
    pub fn needs_secret(mut self, secret: impl Into<Reference>) -> Self {
        self.secrets.push(secret.into());
        self
    }

    /// Declare that this plugin provides `secret`, with the prompt text shown
    /// when it has to be asked for.
    pub fn provides_secret(mut self, secret: impl Into<String>, description: impl Into<String>) -> Self {
        let secret = secret.into();
        let description = description.into();
        match self.secret_providers.iter_mut().find(|(name, _)| *name == secret) {
            Some((_, existing)) => *existing = description,
            None => self.secret_providers.push((secret, description)),
        }
        self
    }

    pub fn with_secret_store(mut self, store: impl SecretStore + 'static) -> Self {
        self.secret_store = Some(Arc::new(store));
        self
    }

    pub fn with_secret_tester(mut self, tester: impl SecretTester + 'static) -> Self {
        self.secret_tester = Some(Arc::new(tester));
        self
    }

    pub fn on_run(mut self, hook: impl PluginHook + 'static) -> Self {
        self.run = Some(Arc::new(hook));
        self
    }

    pub fn on_run_on_repo(mut self, hook: impl PluginHook + 'static) -> Self {
        self.run_on_repo = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[Reference] {
        &self.dependencies
    }

    pub fn secrets(&self) -> &[Reference] {
        &self.secrets
    }

    /// Provided secrets with their descriptions, in declaration order.
    pub fn secret_providers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.secret_providers
            .iter()
            .map(|(name, description)| (name.as_str(), description.as_str()))
    }

    pub fn secret_description(&self, secret: &str) -> Option<&str> {
        self.secret_providers
            .iter()
            .find(|(name, _)| name == secret)
            .map(|(_, description)| description.as_str())
    }

    pub fn secret_store(&self) -> Option<&Arc<dyn SecretStore>> {
        self.secret_store.as_ref()
    }

    pub fn secret_tester(&self) -> Option<&Arc<dyn SecretTester>> {
        self.secret_tester.as_ref()
    }

    pub fn run(&self) -> Option<&Arc<dyn PluginHook>> {
        self.run.as_ref()
    }

    pub fn run_on_repo(&self) -> Option<&Arc<dyn PluginHook>> {
        self.run_on_repo.as_ref()
    }
}

impl fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("secrets", &self.secrets)
            .field("secret_providers", &self.secret_providers)
            .field("secret_store", &self.secret_store.is_some())
            .field("secret_tester", &self.secret_tester.is_some())
            .field("run", &self.run.is_some())
            .field("run_on_repo", &self.run_on_repo.is_some())
            .finish()
    }
}
