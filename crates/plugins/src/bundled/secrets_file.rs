//! `secrets-file` store: a writable JSON map of secret name to value.
//!
//! The file lives at the `path` setting, or `secrets.json` in the envsync data
//! directory. On Unix it is written with mode 0600.

use std::{collections::BTreeMap, path::PathBuf};

use {
    anyhow::{Context, Result, anyhow},
    async_trait::async_trait,
    envsync_config::PluginSettings,
    secrecy::{ExposeSecret, SecretString},
    serde_json::Value,
    tokio::{io::AsyncWriteExt, sync::Mutex},
    tracing::{debug, info},
};

use crate::{capability::SecretStore, definition::PluginDefinition};

pub const NAME: &str = "secrets-file";

const FILE_NAME: &str = "secrets.json";

pub struct FileSecretStore {
    path: Option<PathBuf>,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileSecretStore {
    /// Store whose location comes from settings or the data directory.
    pub fn new() -> Self {
        Self {
            path: None,
            lock: Mutex::new(()),
        }
    }

    /// Store pinned to `path`, ignoring the `path` setting.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            lock: Mutex::new(()),
        }
    }

    fn path(&self, settings: Option<&PluginSettings>) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        match settings.and_then(|settings| settings.lookup("path")) {
            Some(Value::String(path)) => Ok(PathBuf::from(path)),
            Some(Value::Null) | None => envsync_config::data_dir()
                .map(|dir| dir.join(FILE_NAME))
                .ok_or_else(|| anyhow!("could not determine the envsync data directory")),
            Some(_) => Err(anyhow!("the \"path\" setting must be a string")),
        }
    }

    async fn read(path: &PathBuf) -> Result<BTreeMap<String, String>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        serde_json::from_str(&raw).with_context(|| format!("invalid secrets file {}", path.display()))
    }

    async fn write(path: &PathBuf, secrets: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(secrets)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // New files are private from the start.
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options
            .open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;

        // A file created by someone else may be wider.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600)).await?;
        }

        file.write_all(data.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        file.flush().await?;
        Ok(())
    }
}

impl Default for FileSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, secret: &str, settings: Option<&PluginSettings>) -> Result<Option<SecretString>> {
        let path = self.path(settings)?;
        let _guard = self.lock.lock().await;
        let found = Self::read(&path).await?.remove(secret);
        debug!(path = %path.display(), secret, found = found.is_some(), "secrets file lookup");
        Ok(found.map(SecretString::new))
    }

    fn is_writable(&self) -> bool {
        true
    }

    async fn set(&self, secret: &str, value: &SecretString, settings: Option<&PluginSettings>) -> Result<()> {
        let path = self.path(settings)?;
        let _guard = self.lock.lock().await;
        let mut secrets = Self::read(&path).await?;
        secrets.insert(secret.to_string(), value.expose_secret().clone());
        Self::write(&path, &secrets).await?;
        info!(path = %path.display(), secret, "secret saved");
        Ok(())
    }

    async fn remove(&self, secret: &str, settings: Option<&PluginSettings>) -> Result<()> {
        let path = self.path(settings)?;
        let _guard = self.lock.lock().await;
        let mut secrets = Self::read(&path).await?;
        if secrets.remove(secret).is_some() {
            Self::write(&path, &secrets).await?;
            info!(path = %path.display(), secret, "secret removed");
        }
        Ok(())
    }
}

pub fn plugin() -> PluginDefinition {
    PluginDefinition::new(NAME).with_secret_store(FileSecretStore::new())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn missing_file_has_no_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSecretStore::at(dir.path().join("secrets.json"));
        assert!(store.get("travis", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("secrets.json");
        let store = FileSecretStore::at(&path);

        store
            .set("travis", &SecretString::new("t0k3n".into()), None)
            .await
            .unwrap();
        let found = store.get("travis", None).await.unwrap().unwrap();
        assert_eq!(found.expose_secret(), "t0k3n");

        store.remove("travis", None).await.unwrap();
        assert!(store.get("travis", None).await.unwrap().is_none());
        // Removing twice is fine.
        store.remove("travis", None).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        let store = FileSecretStore::at(&path);
        store.set("a", &SecretString::new("b".into()), None).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn existing_world_readable_file_is_tightened_before_writing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, r#"{"old":"value"}"#).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileSecretStore::at(&path);
        store.set("a", &SecretString::new("b".into()), None).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let stored: BTreeMap<String, String> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn path_setting_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("from-settings.json");
        std::fs::write(&path, r#"{"travis":"abc"}"#).unwrap();

        let settings = PluginSettings::from_layers(vec![json!({ "path": path.to_str().unwrap() })]);
        let found = FileSecretStore::new()
            .get("travis", Some(&settings))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.expose_secret(), "abc");
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(FileSecretStore::at(&path).get("travis", None).await.is_err());
    }
}
