//! `env` store: reads secrets from `ENVSYNC_SECRET_*` environment variables.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    envsync_config::PluginSettings,
    secrecy::SecretString,
    tracing::debug,
};

use crate::{capability::SecretStore, definition::PluginDefinition};

pub const NAME: &str = "env";

const VAR_PREFIX: &str = "ENVSYNC_SECRET_";

/// Environment variable holding `secret`: runs of non-word characters become
/// `_` and the result is upper-cased, so `travis-token` maps to
/// `ENVSYNC_SECRET_TRAVIS_TOKEN`.
pub fn env_var_name(secret: &str) -> String {
    let mut name = String::with_capacity(VAR_PREFIX.len() + secret.len());
    name.push_str(VAR_PREFIX);

    let mut in_separator = false;
    for ch in secret.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            name.push(ch.to_ascii_uppercase());
            in_separator = false;
        } else if !in_separator {
            name.push('_');
            in_separator = true;
        }
    }
    name
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct EnvSecretStore {
    lookup: Lookup,
}

impl EnvSecretStore {
    /// Reads the process environment.
    pub fn new() -> Self {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Reads through a custom lookup, so tests never touch the process
    /// environment.
    pub fn with_lookup(lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, secret: &str, _settings: Option<&PluginSettings>) -> Result<Option<SecretString>> {
        let var = env_var_name(secret);
        match (self.lookup)(&var) {
            Some(value) => {
                debug!(%var, "found secret in env variable");
                Ok(Some(SecretString::new(value)))
            },
            None => {
                debug!(%var, "no secret found in env variable");
                Ok(None)
            },
        }
    }
}

pub fn plugin() -> PluginDefinition {
    PluginDefinition::new(NAME).with_secret_store(EnvSecretStore::new())
}
