//! Core TOML config loading: read from path or platform default.

use crate::schema::RelayConfig;
use crate::validation;
use phonectl_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

use super::paths::default_config_path;

/// Load config from a specific TOML file path.
///
/// Missing fields take serde defaults. Validation problems are logged here
/// but not fatal; [`crate::load_config`] validates again after overrides.
pub fn load_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: RelayConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path, or defaults if
/// there is no file there. Unlike a desktop app, the relay never writes a
/// file on its own.
pub fn load_default() -> Result<RelayConfig, ConfigError> {
    let path = match default_config_path() {
        Ok(path) => path,
        Err(e) => {
            info!("{e}; using built-in defaults");
            return Ok(RelayConfig::default());
        }
    };

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config at {}, using built-in defaults", path.display());
            Ok(RelayConfig::default())
        }
        Err(e) => Err(e),
    }
}
