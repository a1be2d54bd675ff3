use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::EnvSyncConfig,
};

/// Standard config file names, checked in order.
pub const CONFIG_FILENAMES: &[&str] = &[
    "envsync.toml",
    "envsync.yaml",
    "envsync.yml",
    "envsync.json",
];

/// Load config from the given path (any supported format).
///
/// The directory containing the file becomes the config's `base_dir`.
pub fn load_config(path: &Path) -> Result<EnvSyncConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);

    let mut config = parse_config(&raw, path)?;
    config.base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    debug!(
        path = %path.display(),
        plugins = config.plugins.len(),
        targets = config.targets().len(),
        "loaded config"
    );
    Ok(config)
}

/// Find and load the config file in `dir`.
pub fn discover_and_load(dir: &Path) -> Result<EnvSyncConfig> {
    debug!(dir = %dir.display(), "looking for config");
    let path = find_config_file(dir).ok_or_else(|| Error::NotFound {
        dir: dir.to_path_buf(),
    })?;
    load_config(&path)
}

/// Find the first config file in `dir`.
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Returns the user data directory (`~/.local/share/envsync` on Linux).
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "envsync").map(|d| d.data_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<EnvSyncConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
