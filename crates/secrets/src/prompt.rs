//! Interactive acquisition of secrets no store could supply.

use std::collections::HashMap;

use {async_trait::async_trait, secrecy::SecretString, tracing::warn};

/// One secret to ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub name: String,
    /// Text shown to the user, the provider's description of the secret.
    pub message: String,
}

/// Asks the user for secret values.
///
/// Called at most once per resolution, with every unresolved secret in one
/// batch. Answers are keyed by request name; missing or empty answers mean
/// the secret stays unresolved.
#[async_trait]
pub trait SecretPrompt: Send + Sync {
    async fn prompt(&self, requests: &[PromptRequest]) -> anyhow::Result<HashMap<String, SecretString>>;
}

/// Answers nothing, for non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

#[async_trait]
impl SecretPrompt for NoPrompt {
    async fn prompt(&self, requests: &[PromptRequest]) -> anyhow::Result<HashMap<String, SecretString>> {
        let names: Vec<&str> = requests.iter().map(|request| request.name.as_str()).collect();
        warn!(secrets = ?names, "prompting disabled, leaving secrets unresolved");
        Ok(HashMap::new())
    }
}
