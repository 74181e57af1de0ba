//! Settings file persistence (a single JSON document)

use crate::error::{MediaripError, Result};
use mediarip_types::Settings;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Location of the settings file and the operations on it
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub async fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            debug!("No settings at {}, using defaults", self.path.display());
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.path).await?;
        serde_json::from_str(&content).map_err(|e| {
            MediaripError::Config(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Write settings, creating the parent directory if needed
    pub async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content).await?;

        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Write a default settings file unless one already exists
    ///
    /// Returns whether a file was created.
    pub async fn init(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        self.save(&Settings::default()).await?;
        info!("Created settings file at {}", self.path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("config.json"));
        let settings = store.load().await.unwrap();
        assert_eq!(settings.deezer.quality, 2);
        assert!(settings.session.verify_ssl);
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested").join("config.json"));

        let mut settings = Settings::default();
        settings.deezer.arl = "cookie".to_string();
        settings.downloads.requests_per_minute = 30;
        store.save(&settings).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.deezer.arl, "cookie");
        assert_eq!(loaded.downloads.requests_per_minute, 30);
    }

    #[tokio::test]
    async fn init_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("config.json"));
        assert!(store.init().await.unwrap());

        let mut settings = store.load().await.unwrap();
        settings.soundcloud.client_id = "abc".to_string();
        store.save(&settings).await.unwrap();

        assert!(!store.init().await.unwrap());
        assert_eq!(store.load().await.unwrap().soundcloud.client_id, "abc");
    }

    #[tokio::test]
    async fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = SettingsStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, MediaripError::Config(_)));
    }
}
