use {envsync_common::quoted_list, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    /// Secrets declared by more than one provider, each with every
    /// declaring plugin.
    #[error("{}", duplicate_providers(.conflicts))]
    DuplicateProviders { conflicts: Vec<(String, Vec<String>)> },

    #[error("missing secret providers for required secrets: {}", quoted_list(.names))]
    MissingProviders { names: Vec<String> },

    #[error("invalid secrets: {}", quoted_list(.names))]
    InvalidSecrets { names: Vec<String> },

    #[error("secret store \"{plugin}\" failed for secret \"{secret}\": {source}")]
    SecretStore {
        plugin: String,
        secret: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("plugin \"{plugin}\" failed to test secret \"{secret}\": {source}")]
    SecretTest {
        plugin: String,
        secret: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to prompt for secrets: {source}")]
    Prompt {
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    #[must_use]
    pub fn secret_store(plugin: &str, secret: &str, source: anyhow::Error) -> Self {
        Self::SecretStore {
            plugin: plugin.to_string(),
            secret: secret.to_string(),
            source,
        }
    }
}

fn duplicate_providers(conflicts: &[(String, Vec<String>)]) -> String {
    let list = conflicts
        .iter()
        .map(|(secret, plugins)| format!("\"{secret}\" (provided by {})", quoted_list(plugins)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("duplicate secret providers for: {list}")
}

pub type Result<T> = std::result::Result<T, Error>;
