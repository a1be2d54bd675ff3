//! Per-target data shared between secret resolution and the sync run.

use std::{collections::BTreeMap, sync::Arc};

use {
    envsync_config::{PluginSettings, ResolvedConfig},
    secrecy::{ExposeSecret, SecretString},
};

use crate::{definition::PluginDefinition, resolve::ResolvedPluginSet};

// ── Secret requirements ─────────────────────────────────────────────────────

/// Why a secret is needed and who describes it.
#[derive(Debug, Clone)]
pub struct SecretRequirement {
    /// At least one plugin needs the secret without the optional marker.
    pub required: bool,
    /// The single plugin declaring the secret in its providers.
    pub provider: Arc<PluginDefinition>,
}

impl SecretRequirement {
    /// Prompt text for `secret`, falling back to the secret's name.
    pub fn description<'a>(&'a self, secret: &'a str) -> &'a str {
        self.provider.secret_description(secret).unwrap_or(secret)
    }
}

/// Secret name → requirement, in order of first encounter.
#[derive(Debug, Clone, Default)]
pub struct SecretNeeds {
    entries: Vec<(String, SecretRequirement)>,
}

impl SecretNeeds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced entry keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, requirement: SecretRequirement) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = requirement,
            None => self.entries.push((name, requirement)),
        }
    }

    /// Merge `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: &SecretNeeds) {
        for (name, requirement) in other.iter() {
            self.insert(name, requirement.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&SecretRequirement> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, requirement)| requirement)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SecretRequirement)> {
        self.entries
            .iter()
            .map(|(name, requirement)| (name.as_str(), requirement))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, requirement)| requirement.required)
            .map(|(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Environment data ────────────────────────────────────────────────────────

/// Values handed to every hook of a sync run.
#[derive(Debug, Clone, Default)]
pub struct EnvData {
    pub secrets: BTreeMap<String, SecretString>,
    /// Hooks should report what they would change without changing it.
    pub dry_run: bool,
}

impl EnvData {
    pub fn with_secrets(secrets: BTreeMap<String, SecretString>) -> Self {
        Self {
            secrets,
            ..Default::default()
        }
    }

    /// A secret's value, if it was resolved to something non-empty.
    pub fn secret(&self, name: &str) -> Option<&str> {
        self.secrets
            .get(name)
            .map(|value| value.expose_secret().as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn has_secret(&self, name: &str) -> bool {
        self.secret(name).is_some()
    }
}

// ── SyncTarget ──────────────────────────────────────────────────────────────

/// One configured repository group, ready to sync. Read-only during a run.
#[derive(Debug, Clone)]
pub struct SyncTarget {
    pub name: Option<String>,
    pub repos: Vec<String>,
    pub plugins: ResolvedPluginSet,
    pub secrets: SecretNeeds,
    pub config: ResolvedConfig,
}

impl SyncTarget {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    pub fn settings_for(&self, plugin: &str) -> Option<&PluginSettings> {
        self.config.settings.get(plugin)
    }
}
