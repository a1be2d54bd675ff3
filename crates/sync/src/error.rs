use {envsync_common::quoted_list, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Plugins(#[from] envsync_plugins::Error),

    #[error(transparent)]
    Secrets(#[from] envsync_secrets::Error),

    #[error("missing required secrets: {}", quoted_list(.names))]
    MissingRequiredSecrets { names: Vec<String> },

    #[error("{}", hook_failure(.plugin, .repo.as_deref(), .source))]
    Hook {
        plugin: String,
        repo: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error("target \"{target}\": {source}")]
    Target {
        target: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{}", targets_failed(.failures))]
    TargetsFailed { failures: Vec<Error> },
}

impl Error {
    #[must_use]
    pub fn hook(plugin: &str, repo: Option<&str>, source: anyhow::Error) -> Self {
        Self::Hook {
            plugin: plugin.to_string(),
            repo: repo.map(str::to_owned),
            source,
        }
    }

    #[must_use]
    pub fn target(target: &str, source: Error) -> Self {
        Self::Target {
            target: target.to_string(),
            source: Box::new(source),
        }
    }
}

fn hook_failure(plugin: &str, repo: Option<&str>, source: &anyhow::Error) -> String {
    match repo {
        Some(repo) => format!("plugin \"{plugin}\" failed on repo \"{repo}\": {source}"),
        None => format!("plugin \"{plugin}\" failed: {source}"),
    }
}

fn targets_failed(failures: &[Error]) -> String {
    let details = failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "{} target{} failed: {details}",
        failures.len(),
        envsync_common::plural_suffix(failures.len())
    )
}

pub type Result<T> = std::result::Result<T, Error>;
