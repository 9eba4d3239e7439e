//! Common paths for imagefeed data storage
//!
//! Everything lives under ~/.config/imagefeed/ on all platforms:
//! - config.toml - User configuration
//! - credentials.enc - Encrypted bearer token

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the imagefeed data directory (~/.config/imagefeed/), creating it if needed
pub fn data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("imagefeed");
    fs::create_dir_all(&dir).context("Failed to create imagefeed directory")?;
    Ok(dir)
}

/// Get the config file path (~/.config/imagefeed/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("config.toml"))
}

/// Get the credentials file path (~/.config/imagefeed/credentials.enc)
pub fn credentials_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("credentials.enc"))
}
