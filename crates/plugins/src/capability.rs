//! Capabilities a plugin can expose: secret storage, secret validation and
//! sync hooks.
//!
//! All capabilities are async traits so implementations can talk to a
//! keychain, a remote API or a terminal without blocking the runtime.
//! Errors are plain [`anyhow::Error`]s; the engine wraps them with the
//! plugin and secret names before surfacing them.

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
    envsync_common::StatusCallback,
    envsync_config::PluginSettings,
    secrecy::SecretString,
};

use crate::target::{EnvData, SyncTarget};

// ── SecretStore ─────────────────────────────────────────────────────────────

/// Looks up (and optionally persists) secret values.
///
/// `settings` is the owning plugin's merged settings, handed out as a private
/// copy so a store cannot change configuration seen by other plugins.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Return the secret's value, or `None` when this store does not have it.
    async fn get(
        &self,
        secret: &str,
        settings: Option<&PluginSettings>,
    ) -> Result<Option<SecretString>>;

    /// Whether [`set`](Self::set) and [`remove`](Self::remove) are supported.
    fn is_writable(&self) -> bool {
        false
    }

    async fn set(
        &self,
        secret: &str,
        _value: &SecretString,
        _settings: Option<&PluginSettings>,
    ) -> Result<()> {
        bail!("secret store cannot save \"{secret}\"")
    }

    async fn remove(&self, secret: &str, _settings: Option<&PluginSettings>) -> Result<()> {
        bail!("secret store cannot remove \"{secret}\"")
    }
}

// ── SecretTester ────────────────────────────────────────────────────────────

/// Validates a secret value before it is used, e.g. by calling the API the
/// secret belongs to. Returning `Ok(false)` rejects the value.
#[async_trait]
pub trait SecretTester: Send + Sync {
    async fn test(&self, secret_name: &str, secret_value: &SecretString) -> Result<bool>;
}

// ── PluginHook ──────────────────────────────────────────────────────────────

/// Everything a hook gets to see while a target is synced.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    /// The target being synced.
    pub config: &'a SyncTarget,
    pub env: &'a EnvData,
    pub status: &'a dyn StatusCallback,
    /// This plugin's merged settings for the target.
    pub settings: Option<&'a PluginSettings>,
    /// Set for per-repository hooks only.
    pub repo: Option<&'a str>,
}

/// A global (`run`) or per-repository (`run_on_repo`) hook.
#[async_trait]
pub trait PluginHook: Send + Sync {
    async fn call(&self, ctx: RunContext<'_>) -> Result<()>;
}
