//! phonectl-relay: WebSocket relay between a phone and a desktop agent.
//!
//! Both sides connect outbound with the same pairing token. The relay keeps
//! at most one connection per (token, role), forwards frames between the
//! two verbatim, and tells each side when the other comes or goes. Payloads
//! are never interpreted beyond their `type` field.

pub mod connection;
pub mod handshake;
pub mod protocol;
pub mod reaper;
pub mod registry;
pub mod server;

pub use connection::ConnectionSettings;
pub use registry::{CloseReason, Registry, RegistryStats};
pub use server::serve;
