//! Application configuration management.
//!
//! Handles loading and saving application-wide settings: where the player
//! state is stored, how to reach the YouTube Data API, and which API key to
//! use. The API key can come from the environment so it never has to be
//! written to disk.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::youtube::DEFAULT_API_BASE_URL;

/// Environment variables checked, in order, for the YouTube API key.
pub const API_KEY_ENV_VARS: [&str; 2] = ["LYRA_YOUTUBE_API_KEY", "YOUTUBE_API_KEY"];

/// Default timeout for catalog requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Application directory name under the platform config/data dirs.
const APP_DIR_NAME: &str = "lyra-player";

/// Settings for the remote video catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Base endpoint of the YouTube Data API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory holding the persisted player state.
    #[serde(default = "default_storage_directory")]
    pub storage_directory: PathBuf,
    /// Remote catalog settings.
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_directory: default_storage_directory(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, or defaults if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific file, or defaults if it doesn't exist.
    ///
    /// Environment overrides are applied after reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                Error::Configuration(format!(
                    "Failed to read config file {}: {e}",
                    path.display()
                ))
            })?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;
            info!("Loaded config from {}", path.display());
            config
        } else {
            debug!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        debug!(
            "Storage directory: {}",
            config.storage_directory.display()
        );
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Take the API key from the environment when one is set.
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = api_key_from_env() {
            if self.catalog.api_key.is_some() {
                debug!("API key from environment overrides config file");
            }
            self.catalog.api_key = Some(key);
        }
    }

    /// Check that the settings are usable.
    ///
    /// A missing API key is not an error here; only fetching needs it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a zero timeout or a base URL that is
    /// not http(s).
    pub fn validate(&self) -> Result<()> {
        if self.catalog.request_timeout_secs == 0 {
            return Err(Error::Configuration(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        let base = self.catalog.base_url.to_lowercase();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(Error::Configuration(format!(
                "Catalog base URL must start with http:// or https://: {}",
                self.catalog.base_url
            )));
        }

        if self.catalog.api_key.is_none() {
            warn!("No YouTube API key configured; adding tracks will fail");
        }
        Ok(())
    }

    /// Get the path to the config file.
    #[must_use]
    pub fn config_file_path() -> PathBuf {
        config_file_path()
    }
}

fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Get the default directory for persisted player state.
#[must_use]
pub fn default_storage_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("storage")
}

/// Get the path to the config file.
fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(APP_DIR_NAME)
        .join("config.json")
}
