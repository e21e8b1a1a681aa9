//! Directory path management for deplan

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the base deplan directory (~/.config/deplan/)
pub fn get_deplan_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Failed to get config directory")?
        .join("deplan"))
}

/// Get the config file path (~/.config/deplan/config.toml)
pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_deplan_dir()?.join("config.toml"))
}
