use serde::{Deserialize, Serialize};

/// Connection directory tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Outbound buffer per connection, in messages.
    pub channel_capacity: u32,
    /// Age after which a token with no connections is forgotten.
    pub entry_ttl_secs: u64,
    pub reap_interval_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            entry_ttl_secs: 300,
            reap_interval_secs: 60,
        }
    }
}
