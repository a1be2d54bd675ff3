use std::sync::Arc;

use {
    envsync_plugins::{PluginDefinition, ResolvedPluginSet, SecretNeeds, SecretRequirement},
    tracing::debug,
};

use crate::error::{Error, Result};

/// Derive which secrets `plugins` need and which plugin provides each one.
///
/// A secret is required when at least one plugin names it without the
/// optional marker. Secrets without a provider are left out, which is only
/// an error for required ones. Entries are ordered by first mention.
///
/// # Errors
///
/// - [`Error::DuplicateProviders`] listing every secret with more than one
///   providing plugin.
/// - [`Error::MissingProviders`] listing every required secret nobody
///   provides.
pub fn aggregate_needs(plugins: &ResolvedPluginSet) -> Result<SecretNeeds> {
    let providers = collect_providers(plugins)?;

    let mut mentioned: Vec<(&str, bool)> = Vec::new();
    for plugin in plugins.plugins() {
        for secret in plugin.secrets() {
            let required = !secret.is_optional();
            match mentioned.iter_mut().find(|(name, _)| *name == secret.name()) {
                Some((_, seen_required)) => *seen_required |= required,
                None => mentioned.push((secret.name(), required)),
            }
        }
    }

    let missing: Vec<String> = mentioned
        .iter()
        .filter(|(name, required)| *required && !providers.iter().any(|(secret, _)| secret == name))
        .map(|(name, _)| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingProviders { names: missing });
    }

    let mut needs = SecretNeeds::new();
    for (name, required) in mentioned {
        let Some((_, provider)) = providers.iter().find(|(secret, _)| *secret == name) else {
            debug!(secret = name, "optional secret has no provider, skipping");
            continue;
        };
        needs.insert(name, SecretRequirement {
            required,
            provider: Arc::clone(provider),
        });
    }

    debug!(count = needs.len(), "aggregated secret needs");
    Ok(needs)
}

/// Secret name to its single provider, or every conflict at once.
fn collect_providers(plugins: &ResolvedPluginSet) -> Result<Vec<(&str, &Arc<PluginDefinition>)>> {
    let mut providers: Vec<(&str, Vec<&Arc<PluginDefinition>>)> = Vec::new();
    for plugin in plugins.plugins() {
        for (secret, _) in plugin.secret_providers() {
            match providers.iter_mut().find(|(name, _)| *name == secret) {
                Some((_, declared_by)) => declared_by.push(plugin),
                None => providers.push((secret, vec![plugin])),
            }
        }
    }

    let conflicts: Vec<(String, Vec<String>)> = providers
        .iter()
        .filter(|(_, declared_by)| declared_by.len() > 1)
        .map(|(secret, declared_by)| {
            let names = declared_by.iter().map(|plugin| plugin.name().to_string()).collect();
            (secret.to_string(), names)
        })
        .collect();
    if !conflicts.is_empty() {
        return Err(Error::DuplicateProviders { conflicts });
    }

    Ok(providers
        .into_iter()
        .filter_map(|(secret, declared_by)| declared_by.first().map(|plugin| (secret, *plugin)))
        .collect())
}
