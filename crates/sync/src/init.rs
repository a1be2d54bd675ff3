//! Turning a loaded config into sync targets.

use {
    envsync_config::{EnvSyncConfig, ResolvedConfig, TargetConfig, merge_target_config},
    envsync_plugins::{PluginLoader, ResolveOptions, ResolvedPluginSet, SecretNeeds, SyncTarget, resolve_plugins},
    envsync_secrets::aggregate_needs,
    futures::future::join_all,
    tracing::{debug, info},
};

use crate::error::{Error, Result};

/// Plugins configured at the top level, outside any target group.
///
/// Their secret stores are the ones used to resolve secret values.
#[derive(Debug, Clone)]
pub struct EnvSyncBase {
    pub plugins: ResolvedPluginSet,
    pub secrets: SecretNeeds,
    pub config: ResolvedConfig,
}

#[derive(Debug, Clone)]
pub struct EnvSyncSetup {
    pub base: EnvSyncBase,
    pub targets: Vec<SyncTarget>,
    /// Every target's secret needs. For a secret needed by several targets
    /// the last target's requirement wins.
    pub secrets: SecretNeeds,
}

/// Resolve plugins and secret needs for the base config and for every
/// target group. Target groups are initialised concurrently.
///
/// # Errors
///
/// - [`Error::TargetsFailed`] listing every target group that failed.
/// - [`Error::Plugins`] or [`Error::Secrets`] when the base config fails.
pub async fn init_env_sync(config: &EnvSyncConfig, loader: &dyn PluginLoader) -> Result<EnvSyncSetup> {
    let groups = config.targets();
    debug!(groups = groups.len(), "initialising target groups");

    let results = join_all(groups.iter().map(|group| init_target(group, config, loader))).await;

    let mut targets = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (group, result) in groups.iter().zip(results) {
        match result {
            Ok(target) => targets.push(target),
            Err(e) => failures.push(Error::target(group.name.as_deref().unwrap_or("unnamed"), e)),
        }
    }
    if !failures.is_empty() {
        return Err(Error::TargetsFailed { failures });
    }

    let mut secrets = SecretNeeds::new();
    for target in &targets {
        secrets.extend(&target.secrets);
    }

    let base_config = config.base_config();
    let (plugins, base_secrets) = init_part(&base_config, loader).await?;

    info!(
        targets = targets.len(),
        base_plugins = plugins.len(),
        secrets = secrets.len(),
        "envsync initialised"
    );

    Ok(EnvSyncSetup {
        base: EnvSyncBase {
            plugins,
            secrets: base_secrets,
            config: base_config,
        },
        targets,
        secrets,
    })
}

async fn init_target(group: &TargetConfig, config: &EnvSyncConfig, loader: &dyn PluginLoader) -> Result<SyncTarget> {
    let merged = merge_target_config(group, config);
    let (plugins, secrets) = init_part(&merged.config, loader).await?;
    debug!(
        target_group = group.name.as_deref().unwrap_or("unnamed"),
        plugins = ?plugins.names(),
        "target group resolved"
    );

    Ok(SyncTarget {
        name: merged.name,
        repos: merged.repos,
        plugins,
        secrets,
        config: merged.config,
    })
}

async fn init_part(config: &ResolvedConfig, loader: &dyn PluginLoader) -> Result<(ResolvedPluginSet, SecretNeeds)> {
    let plugins = resolve_plugins(&config.plugins, loader, ResolveOptions::default()).await?;
    let secrets = aggregate_needs(&plugins)?;
    Ok((plugins, secrets))
}
