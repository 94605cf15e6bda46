//! Configuration schema types for the relay.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod logging;
mod registry;
mod server;

pub use logging::*;
pub use registry::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}
