//! Secret value resolution: stores first, then one batched prompt, then
//! validation.

use std::collections::{BTreeMap, HashSet};

use {
    envsync_config::Settings,
    envsync_plugins::{ResolvedPluginSet, SecretNeeds},
    secrecy::{ExposeSecret, SecretString},
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    prompt::{PromptRequest, SecretPrompt},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ValueOptions {
    /// Save prompted values that passed validation to the first writable
    /// store.
    pub persist_prompted: bool,
}

/// Resolve a value for every secret in `needs`.
///
/// Stores are consulted in resolution order, each with its own copy of its
/// plugin's settings; the walk stops at the first store holding a value.
/// Secrets no store has, and secrets whose first value is empty, are asked
/// for in one batched prompt. Every value held afterwards is
/// checked by its provider's tester: invalid optional secrets are dropped,
/// invalid required ones fail the resolution together.
///
/// The result only holds resolved secrets. An empty `needs` returns
/// immediately without touching any store or the prompt.
///
/// # Errors
///
/// - [`Error::SecretStore`] when a store lookup (or save) fails.
/// - [`Error::Prompt`] when the prompt fails.
/// - [`Error::SecretTest`] when a tester fails.
/// - [`Error::InvalidSecrets`] listing every required secret that failed
///   validation.
pub async fn resolve_values(
    needs: &SecretNeeds,
    plugins: &ResolvedPluginSet,
    settings: &Settings,
    prompt: &dyn SecretPrompt,
    options: ValueOptions,
) -> Result<BTreeMap<String, SecretString>> {
    let mut resolved = BTreeMap::new();
    if needs.is_empty() {
        return Ok(resolved);
    }

    debug!(count = needs.len(), "resolving secrets");

    let mut requests = Vec::new();
    for (secret, requirement) in needs.iter() {
        match lookup(secret, plugins, settings).await? {
            Some(value) if !value.expose_secret().is_empty() => {
                resolved.insert(secret.to_string(), value);
            },
            found => {
                if found.is_some() {
                    debug!(secret, "store returned an empty value");
                } else {
                    debug!(secret, "secret not found in any store");
                }
                requests.push(PromptRequest {
                    name: secret.to_string(),
                    message: requirement.description(secret).to_string(),
                });
            },
        }
    }

    debug!(count = resolved.len(), "secrets resolved from stores");

    let mut prompted = Vec::new();
    if !requests.is_empty() {
        info!(count = requests.len(), "asking for secrets");
        let asked: HashSet<&str> = requests.iter().map(|request| request.name.as_str()).collect();
        let answers = prompt
            .prompt(&requests)
            .await
            .map_err(|source| Error::Prompt { source })?;

        for (name, value) in answers {
            if !asked.contains(name.as_str()) {
                warn!(secret = %name, "ignoring answer for a secret that was not asked for");
                continue;
            }
            if value.expose_secret().is_empty() {
                continue;
            }
            prompted.push(name.clone());
            resolved.insert(name, value);
        }
    }

    let mut invalid = Vec::new();
    for (secret, requirement) in needs.iter() {
        let Some(value) = resolved.get(secret) else {
            continue;
        };
        let Some(tester) = requirement.provider.secret_tester() else {
            continue;
        };

        let valid = tester
            .test(secret, value)
            .await
            .map_err(|source| Error::SecretTest {
                plugin: requirement.provider.name().to_string(),
                secret: secret.to_string(),
                source,
            })?;
        if !valid {
            resolved.remove(secret);
            if requirement.required {
                invalid.push(secret.to_string());
            } else {
                debug!(secret, "optional secret failed validation, dropping it");
            }
        }
    }

    if !invalid.is_empty() {
        return Err(Error::InvalidSecrets { names: invalid });
    }

    if options.persist_prompted {
        persist(&prompted, &resolved, plugins, settings).await?;
    }

    debug!(secrets = ?resolved.keys().collect::<Vec<_>>(), "using secrets");
    Ok(resolved)
}

/// Remove `names` from every writable store.
///
/// # Errors
///
/// Fails with [`Error::SecretStore`] on the first store that cannot remove a
/// secret.
pub async fn forget_secrets<S: AsRef<str>>(
    names: &[S],
    plugins: &ResolvedPluginSet,
    settings: &Settings,
) -> Result<()> {
    for (plugin, store) in plugins.secret_stores().filter(|(_, store)| store.is_writable()) {
        let plugin_settings = settings.get(plugin.name()).cloned();
        for name in names {
            let name = name.as_ref();
            store
                .remove(name, plugin_settings.as_ref())
                .await
                .map_err(|source| Error::secret_store(plugin.name(), name, source))?;
            info!(plugin = plugin.name(), secret = name, "secret forgotten");
        }
    }
    Ok(())
}

async fn lookup(secret: &str, plugins: &ResolvedPluginSet, settings: &Settings) -> Result<Option<SecretString>> {
    for (plugin, store) in plugins.secret_stores() {
        // Each store works on its own copy.
        let plugin_settings = settings.get(plugin.name()).cloned();
        let value = store
            .get(secret, plugin_settings.as_ref())
            .await
            .map_err(|source| Error::secret_store(plugin.name(), secret, source))?;

        if value.is_some() {
            debug!(secret, store = plugin.name(), "found secret");
            return Ok(value);
        }
    }
    Ok(None)
}

async fn persist(
    prompted: &[String],
    resolved: &BTreeMap<String, SecretString>,
    plugins: &ResolvedPluginSet,
    settings: &Settings,
) -> Result<()> {
    if prompted.is_empty() {
        return Ok(());
    }
    let Some((plugin, store)) = plugins.secret_stores().find(|(_, store)| store.is_writable()) else {
        warn!("no writable secret store, prompted secrets are not saved");
        return Ok(());
    };

    let plugin_settings = settings.get(plugin.name()).cloned();
    for name in prompted {
        let Some(value) = resolved.get(name) else {
            continue;
        };
        store
            .set(name, value, plugin_settings.as_ref())
            .await
            .map_err(|source| Error::secret_store(plugin.name(), name, source))?;
        info!(plugin = plugin.name(), secret = %name, "saved prompted secret");
    }
    Ok(())
}
