use {
    envsync_common::{plural_suffix, quoted_list},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("invalid plugin name \"{name}\": {reason}")]
    InvalidPluginName { name: String, reason: String },

    #[error("plugin \"{name}\" is already registered")]
    AlreadyRegistered { name: String },

    #[error("failed to load plugin \"{name}\": {source}")]
    PluginLoad {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to add plugin \"{name}\": its dependencies form a cycle")]
    PluginAdd { name: String },

    #[error("{}", missing_plugins(.names))]
    MissingPlugins { names: Vec<String> },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_plugin_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPluginName {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

fn missing_plugins(names: &[String]) -> String {
    format!(
        "plugin{} missing: {}",
        plural_suffix(names.len()),
        quoted_list(names)
    )
}

pub type Result<T> = std::result::Result<T, Error>;
