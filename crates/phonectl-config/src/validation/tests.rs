//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    assert!(validate(&RelayConfig::default()).is_ok());
}

#[test]
fn catches_port_zero() {
    let mut config = RelayConfig::default();
    config.server.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.port"));
}

#[test]
fn catches_blank_host() {
    let mut config = RelayConfig::default();
    config.server.host = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.host"));
}

#[test]
fn catches_ttl_too_short() {
    let mut config = RelayConfig::default();
    config.registry.entry_ttl_secs = 1;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("registry.entry_ttl_secs"));
}

#[test]
fn log_level_is_case_insensitive() {
    let mut config = RelayConfig::default();
    config.logging.level = "DEBUG".into();
    assert!(validate(&config).is_ok());

    config.logging.level = "verbose".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("logging.level"));
}

#[test]
fn collects_every_error() {
    let mut config = RelayConfig::default();
    config.server.handshake_timeout_secs = 0;
    config.registry.channel_capacity = 0;
    config.registry.reap_interval_secs = 7200;

    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("server.handshake_timeout_secs"));
    assert!(err.contains("registry.channel_capacity"));
    assert!(err.contains("registry.reap_interval_secs"));
    assert_eq!(err.matches(';').count(), 2);
}
