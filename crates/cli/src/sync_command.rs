use std::path::Path;

use {
    envsync_common::{StatusCallback, TracingStatus},
    envsync_config::EnvSyncConfig,
    envsync_plugins::{EnvData, PluginLoader, PluginRegistry},
    envsync_secrets::{NoPrompt, SecretPrompt, ValueOptions, forget_secrets, resolve_values},
    envsync_sync::{init_env_sync, sync_all},
    tracing::{info, warn},
};

use crate::terminal_prompt::TerminalPrompt;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
    /// Ask on the terminal for secrets no store has.
    pub prompt: bool,
    pub persist: bool,
    pub reset: bool,
}

pub async fn run(path: &Path, options: SyncOptions) -> anyhow::Result<()> {
    let config = load(path)?;
    let registry = PluginRegistry::with_bundled();
    let prompt: Box<dyn SecretPrompt> = if options.prompt {
        Box::new(TerminalPrompt)
    } else {
        Box::new(NoPrompt)
    };

    sync_config(&config, &registry, prompt.as_ref(), &TracingStatus, options).await
}

/// `path` is either a config file or a directory holding one.
fn load(path: &Path) -> anyhow::Result<EnvSyncConfig> {
    let config = if path.is_file() {
        envsync_config::load_config(path)?
    } else {
        envsync_config::discover_and_load(path)?
    };
    Ok(config)
}

async fn sync_config(
    config: &EnvSyncConfig,
    loader: &dyn PluginLoader,
    prompt: &dyn SecretPrompt,
    status: &dyn StatusCallback,
    options: SyncOptions,
) -> anyhow::Result<()> {
    let setup = init_env_sync(config, loader).await?;
    if setup.targets.is_empty() {
        warn!("no targets configured, nothing to sync");
        return Ok(());
    }

    let stores = &setup.base.plugins;
    let settings = &setup.base.config.settings;

    if options.reset {
        let names: Vec<&str> = setup.secrets.names().collect();
        forget_secrets(&names, stores, settings).await?;
        info!(count = names.len(), "forgot stored secrets");
    }

    let secrets = resolve_values(&setup.secrets, stores, settings, prompt, ValueOptions {
        persist_prompted: options.persist,
    })
    .await?;

    let env = EnvData {
        secrets,
        dry_run: options.dry_run,
    };
    sync_all(&setup.targets, &env, status).await?;

    info!(targets = setup.targets.len(), dry_run = options.dry_run, "sync complete");
    Ok(())
}
