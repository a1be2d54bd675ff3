//! `settings-secrets` store: reads secrets straight from the plugin's settings.
//!
//! ```toml
//! [settings.settings-secrets]
//! travis = "${TRAVIS_TOKEN}"
//! ```

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
    envsync_config::PluginSettings,
    secrecy::SecretString,
    serde_json::Value,
    tracing::debug,
};

use crate::{capability::SecretStore, definition::PluginDefinition};

pub const NAME: &str = "settings-secrets";

pub struct SettingsSecretStore;

#[async_trait]
impl SecretStore for SettingsSecretStore {
    async fn get(&self, secret: &str, settings: Option<&PluginSettings>) -> Result<Option<SecretString>> {
        match settings.and_then(|settings| settings.lookup(secret)) {
            None | Some(Value::Null) => {
                debug!(secret, "no secret found in settings");
                Ok(None)
            },
            Some(Value::String(value)) => {
                debug!(secret, "found secret in settings");
                Ok(Some(SecretString::new(value.clone())))
            },
            Some(other) => bail!(
                "invalid data type for secret \"{secret}\": expected a string, got {}",
                type_name(other)
            ),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn plugin() -> PluginDefinition {
    PluginDefinition::new(NAME).with_secret_store(SettingsSecretStore)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {secrecy::ExposeSecret, serde_json::json};

    use super::*;

    fn settings(layers: Vec<Value>) -> PluginSettings {
        PluginSettings::from_layers(layers)
    }

    #[tokio::test]
    async fn reads_most_specific_layer() {
        let settings = settings(vec![json!({ "travis": "base" }), json!({ "travis": "target" })]);
        let found = SettingsSecretStore
            .get("travis", Some(&settings))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.expose_secret(), "target");
    }

    #[tokio::test]
    async fn nothing_without_settings() {
        assert!(SettingsSecretStore.get("travis", None).await.unwrap().is_none());
        let empty = settings(vec![json!({})]);
        assert!(SettingsSecretStore.get("travis", Some(&empty)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_string_values_are_errors() {
        let settings = settings(vec![json!({ "travis": 42 })]);
        let err = SettingsSecretStore
            .get("travis", Some(&settings))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("got number"), "{err}");
    }
}
