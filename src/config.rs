//! Configuration module for imagefeed

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::paths;
use crate::services::DEFAULT_PER_PAGE;

/// Environment variable overriding [`Config::access_key`]
pub const ACCESS_KEY_ENV: &str = "IMAGEFEED_ACCESS_KEY";
/// Environment variable overriding [`Config::secret_key`]
pub const SECRET_KEY_ENV: &str = "IMAGEFEED_SECRET_KEY";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Base URL of the OAuth pages and token endpoint
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,

    /// OAuth client id (the application's access key)
    #[serde(default)]
    pub access_key: String,

    /// OAuth client secret
    #[serde(default)]
    pub secret_key: String,

    /// Redirect URI registered for the application
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Space-separated OAuth scopes
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Number of photos to fetch per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_api_base_url() -> String {
    "https://api.unsplash.com".to_string()
}

fn default_auth_base_url() -> String {
    "https://unsplash.com".to_string()
}

fn default_redirect_uri() -> String {
    "urn:ietf:wg:oauth:2.0:oob".to_string()
}

fn default_scope() -> String {
    "public read_user write_likes".to_string()
}

const fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            auth_base_url: default_auth_base_url(),
            access_key: String::new(),
            secret_key: String::new(),
            redirect_uri: default_redirect_uri(),
            scope: default_scope(),
            per_page: default_per_page(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        paths::config_path()
    }

    /// Load config from the default path, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Override the OAuth client credentials from the environment, when set
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(ACCESS_KEY_ENV) {
            if !key.is_empty() {
                self.access_key = key;
            }
        }
        if let Ok(secret) = std::env::var(SECRET_KEY_ENV) {
            if !secret.is_empty() {
                self.secret_key = secret;
            }
        }
    }

    /// Check that the OAuth client credentials are present
    pub fn ensure_client_credentials(&self) -> Result<()> {
        anyhow::ensure!(
            !self.access_key.is_empty(),
            "No access key configured: set `access_key` in the config file or {ACCESS_KEY_ENV}"
        );
        anyhow::ensure!(
            !self.secret_key.is_empty(),
            "No secret key configured: set `secret_key` in the config file or {SECRET_KEY_ENV}"
        );
        Ok(())
    }
}
