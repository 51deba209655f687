//! Config loading and default locations.

use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::error::SessionError;

/// Load configuration from the given path, or the default location.
pub fn load_config(path: Option<&str>) -> Result<Config, SessionError> {
    let config_path = match path {
        Some(p) => PathBuf::from(p),
        None => default_config_path(),
    };

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!("failed to read config {}: {e}", config_path.display())
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("failed to parse config {}: {e}", config_path.display())
        })?;
        info!(path = %config_path.display(), "loaded config");
        Ok(config)
    } else {
        info!("no config file found, using defaults");
        Ok(Config::default())
    }
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("vice-netplay")
}

/// Get the default config file path.
fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Some("/nonexistent/vice-netplay/config.toml")).unwrap();
        assert_eq!(config.netplay.port, 6502);
    }

    #[test]
    fn reads_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[netplay]\nport = 7000\n").unwrap();
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.netplay.port, 7000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[netplay\nport = ").unwrap();
        let result = load_config(path.to_str());
        assert!(matches!(result, Err(SessionError::Other(_))));
    }
}
