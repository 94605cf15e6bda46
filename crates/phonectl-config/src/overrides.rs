//! Environment variable overrides.
//!
//! Hosting platforms hand the relay its port through `PORT`, so the
//! environment sits above the config file.

use crate::schema::RelayConfig;
use phonectl_common::ConfigError;

pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "RELAY_HOST";
pub const ENV_ENTRY_TTL: &str = "RELAY_ENTRY_TTL_SECS";

/// Apply overrides from the process environment.
pub fn apply_process_env(config: &mut RelayConfig) -> Result<(), ConfigError> {
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup`. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = get(ENV_PORT) {
        config.server.port = parse_var(ENV_PORT, &port)?;
    }
    if let Some(host) = get(ENV_HOST) {
        config.server.host = host.trim().to_string();
    }
    if let Some(ttl) = get(ENV_ENTRY_TTL) {
        config.registry.entry_ttl_secs = parse_var(ENV_ENTRY_TTL, &ttl)?;
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::ParseError(format!("{key}={raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn port_and_host_override_file_values() {
        let vars = env(&[("PORT", "10000"), ("RELAY_HOST", "127.0.0.1")]);
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn ttl_override() {
        let vars = env(&[("RELAY_ENTRY_TTL_SECS", " 900 ")]);
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.registry.entry_ttl_secs, 900);
    }

    #[test]
    fn unset_and_empty_vars_leave_config_alone() {
        let vars = env(&[("PORT", "")]);
        let mut config = RelayConfig::default();
        apply_env_overrides(&mut config, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn bad_port_is_parse_error() {
        let vars = env(&[("PORT", "eighty")]);
        let mut config = RelayConfig::default();
        let err = apply_env_overrides(&mut config, |k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains("PORT"));
    }
}
