//! Sync client configuration.

use crate::platform::{get_default_credentials_path, get_default_database_path};
use crate::{NoteSyncError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the remote record store, e.g. `https://host/v1`.
    pub remote_url: String,
    pub bucket: String,
    pub collection: String,
    pub note_id: String,
    /// UI surface lifecycle messages are addressed to.
    pub recipient_id: String,
    pub request_timeout_secs: u64,
    pub database_path: PathBuf,
    pub credentials_path: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_url: "https://kinto.example.com/v1".to_string(),
            bucket: "default".to_string(),
            collection: "notes".to_string(),
            note_id: "singleNote".to_string(),
            recipient_id: "notes@mozilla.com".to_string(),
            request_timeout_secs: 30,
            database_path: get_default_database_path(),
            credentials_path: get_default_credentials_path(),
        }
    }
}

impl SyncConfig {
    /// Parse a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Like [`SyncConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml_dep::from_str(content).map_err(|e| NoteSyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if !(self.remote_url.starts_with("http://") || self.remote_url.starts_with("https://")) {
            return Err(NoteSyncError::Config(format!(
                "remote_url must be an http(s) URL, got {:?}",
                self.remote_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(NoteSyncError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
