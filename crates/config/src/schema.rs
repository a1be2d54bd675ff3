//! Config schema types: the top-level file, target groups and the merged
//! per-target view handed to the engine.

use std::{collections::BTreeMap, path::PathBuf};

use {
    envsync_common::Reference,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Plugin list and raw per-plugin settings of one config layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    pub plugins: Vec<Reference>,
    pub settings: BTreeMap<String, Value>,
}

/// One configured group of repositories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub name: Option<String>,
    pub repos: Vec<String>,
    pub config: BaseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum TargetGroups {
    Many(Vec<TargetConfig>),
    One(TargetConfig),
}

impl Default for TargetGroups {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// Root of an `envsync.{toml,yaml,json}` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvSyncConfig {
    /// Directory the config was loaded from.
    #[serde(skip)]
    pub base_dir: PathBuf,
    pub plugins: Vec<Reference>,
    pub settings: BTreeMap<String, Value>,
    pub(crate) target: TargetGroups,
}

impl EnvSyncConfig {
    pub fn with_targets(mut self, targets: Vec<TargetConfig>) -> Self {
        self.target = TargetGroups::Many(targets);
        self
    }

    /// Target groups in configured order; a single `[target]` table counts as one.
    pub fn targets(&self) -> &[TargetConfig] {
        match &self.target {
            TargetGroups::One(target) => std::slice::from_ref(target),
            TargetGroups::Many(targets) => targets,
        }
    }

    /// The base layer on its own, as used for secret stores.
    pub fn base_config(&self) -> ResolvedConfig {
        ResolvedConfig {
            base_dir: self.base_dir.clone(),
            plugins: self.plugins.clone(),
            settings: crate::merge::lossless_merge([&self.settings]),
        }
    }
}

// ── Merged view ─────────────────────────────────────────────────────────────

/// Every layer's value for one plugin, least specific first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginSettings(Vec<Value>);

impl PluginSettings {
    pub fn from_layers(layers: Vec<Value>) -> Self {
        Self(layers)
    }

    pub fn layers(&self) -> &[Value] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up `key` in the object layers, most specific layer first.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.0
            .iter()
            .rev()
            .filter_map(Value::as_object)
            .find_map(|layer| layer.get(key))
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.0.push(value);
    }
}

/// Plugin name → merged settings.
pub type Settings = BTreeMap<String, PluginSettings>;

/// A config layer after merging base and target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub base_dir: PathBuf,
    pub plugins: Vec<Reference>,
    pub settings: Settings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTargetConfig {
    pub name: Option<String>,
    pub repos: Vec<String>,
    pub config: ResolvedConfig,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_target_table_is_one_group() {
        let config: EnvSyncConfig = toml::from_str(
            r#"
plugins = ["env?"]

[target]
name = "web"
repos = ["acme/site"]
"#,
        )
        .unwrap();
        assert_eq!(config.plugins, vec![Reference::optional("env")]);
        assert_eq!(config.targets().len(), 1);
        assert_eq!(config.targets()[0].name.as_deref(), Some("web"));
    }

    #[test]
    fn target_array_keeps_order() {
        let config: EnvSyncConfig = serde_json::from_str(
            r#"{ "target": [ { "name": "a" }, { "name": "b", "repos": ["x/y"] } ] }"#,
        )
        .unwrap();
        let names: Vec<_> = config
            .targets()
            .iter()
            .map(|t| t.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn missing_target_means_no_groups() {
        let config: EnvSyncConfig = toml::from_str("plugins = [\"env\"]").unwrap();
        assert!(config.targets().is_empty());
    }

    #[test]
    fn lookup_prefers_most_specific_layer() {
        let settings = PluginSettings::from_layers(vec![
            serde_json::json!({ "token": "base", "org": "acme" }),
            serde_json::json!("not an object"),
            serde_json::json!({ "token": "target" }),
        ]);
        assert_eq!(settings.lookup("token"), Some(&serde_json::json!("target")));
        assert_eq!(settings.lookup("org"), Some(&serde_json::json!("acme")));
        assert_eq!(settings.lookup("missing"), None);
    }
}
