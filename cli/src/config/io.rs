//! Configuration file I/O operations
//!
//! Loading always validates; an invalid file is an error, a missing one is
//! the default configuration.

use super::paths::get_config_path;
use super::schema::DeplanConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Load configuration from `path`, or from ~/.config/deplan/config.toml when `None`
pub fn load_config(path: Option<&Path>) -> Result<DeplanConfig> {
    match path {
        Some(path) => load_config_from(path),
        None => {
            let path = get_config_path()?;
            if !path.exists() {
                return Ok(DeplanConfig::default());
            }
            load_config_from(&path)
        }
    }
}

/// Load and validate a specific config file; it must exist
pub fn load_config_from(path: &Path) -> Result<DeplanConfig> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read config: {}", path.display()))?;

    let config: DeplanConfig =
        toml::from_str(&content).context(format!("Failed to parse config: {}", path.display()))?;

    if let Err(errors) = config.validate() {
        anyhow::bail!(
            "Config validation failed in {}:\n  {}",
            path.display(),
            errors.join("\n  ")
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            resolve_optional_imports = true

            [planner]
            url_handlers_timeout_ms = -1

            [system]
            packages = ["org.osgi.framework;version=1.8"]
            "#,
        )
        .unwrap();

        let config = load_config(Some(&config_path)).unwrap();
        assert!(config.resolve_optional_imports);
        assert!(config.planner.handler_timeout().is_none());
        assert_eq!(config.system.packages.len(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[planner]\ndynamic_protocols = [\"wrap:\"]\n").unwrap();

        let err = load_config(Some(&config_path)).unwrap_err();
        assert!(err.to_string().contains("Config validation failed"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_config(Some(&temp_dir.path().join("nope.toml"))).is_err());
    }
}
