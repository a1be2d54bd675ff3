//! Merging of config layers.
//!
//! Settings are merged losslessly: instead of a later layer overwriting an
//! earlier one, every layer's value for a plugin is kept, in layer order.
//! Plugins decide how to read their layers (see [`PluginSettings::lookup`]).

use std::collections::BTreeMap;

use {serde_json::Value, tracing::debug};

use crate::schema::{
    EnvSyncConfig, PluginSettings, ResolvedConfig, ResolvedTargetConfig, Settings, TargetConfig,
};

/// Collect every layer's value for each settings key into an ordered list.
///
/// Layers are visited in order; a key absent from a layer contributes
/// nothing for that layer. Values are cloned, the inputs are left untouched.
pub fn lossless_merge<'a>(layers: impl IntoIterator<Item = &'a BTreeMap<String, Value>>) -> Settings {
    let mut merged = Settings::new();

    for layer in layers {
        for (key, value) in layer {
            merged
                .entry(key.clone())
                .or_insert_with(PluginSettings::default)
                .push(value.clone());
        }
    }

    merged
}

/// Merge a target group's config on top of the base config.
///
/// Plugins are concatenated (base first), settings are merged losslessly
/// and the base directory always comes from the base config.
pub fn merge_target_config(target: &TargetConfig, base: &EnvSyncConfig) -> ResolvedTargetConfig {
    let plugins = base
        .plugins
        .iter()
        .chain(&target.config.plugins)
        .cloned()
        .collect::<Vec<_>>();

    let settings = lossless_merge([&base.settings, &target.config.settings]);

    debug!(
        target_group = target.name.as_deref().unwrap_or("unnamed"),
        plugins = plugins.len(),
        settings = settings.len(),
        "merged target config"
    );

    ResolvedTargetConfig {
        name: target.name.clone(),
        repos: target.repos.clone(),
        config: ResolvedConfig {
            base_dir: base.base_dir.clone(),
            plugins,
            settings,
        },
    }
}
