//! Relay configuration.
//!
//! TOML file with serde defaults, layered under environment variables. All
//! sections default sensibly, so an absent or partial file works.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use phonectl_config::load_config;
//!
//! let config = load_config(None).expect("failed to load config");
//! println!("listening on {}", config.server.bind_addr());
//! ```

pub mod overrides;
pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use overrides::{apply_env_overrides, apply_process_env};
pub use schema::{LoggingConfig, RegistryConfig, RelayConfig, ServerConfig};
pub use toml_loader::{create_default_config, default_config_path, load_default, load_from_path};

use phonectl_common::ConfigError;
use std::path::Path;

/// Load config from `explicit` (or the platform default path), apply
/// environment overrides, and validate the result.
pub fn load_config(explicit: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match explicit {
        Some(path) => load_from_path(path)?,
        None => load_default()?,
    };

    apply_process_env(&mut config)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &RelayConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}
