//! Default TOML config template with inline documentation comments.

pub(crate) fn default_config_toml() -> &'static str {
    r##"# phonectl relay configuration
# Only override what you want to change -- missing fields use defaults.
# Environment variables PORT, RELAY_HOST and RELAY_ENTRY_TTL_SECS win over this file.

[server]
# host = "0.0.0.0"
# port = 8080
# handshake_timeout_secs = 10   # 1-120

[registry]
# channel_capacity = 256        # 1-65536 messages buffered per connection
# entry_ttl_secs = 300          # 10-86400, forget tokens idle this long
# reap_interval_secs = 60       # 1-3600

[logging]
# level = "info"                # trace, debug, info, warn, error
# json = false
"##
}
