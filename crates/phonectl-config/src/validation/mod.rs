//! Full configuration validation.
//!
//! Each section has its own check; errors are collected into a single
//! `ConfigError` so an operator sees every problem at once.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::RelayConfig;
use helpers::{validate_one_of, validate_range};
use phonectl_common::ConfigError;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_server(&mut errors, config);
    validate_registry(&mut errors, config);
    validate_logging(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_server(errors: &mut Vec<String>, config: &RelayConfig) {
    let server = &config.server;
    if server.host.trim().is_empty() {
        errors.push("server.host must not be empty".into());
    }
    validate_range(errors, "server.port", u64::from(server.port), 1, 65535);
    validate_range(
        errors,
        "server.handshake_timeout_secs",
        server.handshake_timeout_secs,
        1,
        120,
    );
}

fn validate_registry(errors: &mut Vec<String>, config: &RelayConfig) {
    let registry = &config.registry;
    validate_range(
        errors,
        "registry.channel_capacity",
        u64::from(registry.channel_capacity),
        1,
        65536,
    );
    validate_range(errors, "registry.entry_ttl_secs", registry.entry_ttl_secs, 10, 86400);
    validate_range(
        errors,
        "registry.reap_interval_secs",
        registry.reap_interval_secs,
        1,
        3600,
    );
}

fn validate_logging(errors: &mut Vec<String>, config: &RelayConfig) {
    validate_one_of(errors, "logging.level", &config.logging.level, LOG_LEVELS);
}
