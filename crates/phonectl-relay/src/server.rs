//! Accept loop.

use std::future::Future;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinSet;

use phonectl_config::RelayConfig;

use crate::connection::{handle_socket, ConnectionSettings};
use crate::registry::{CloseReason, Registry};


/// How long shutdown waits for connections to finish their close handshake.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

impl From<&RelayConfig> for ConnectionSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            channel_capacity: config.registry.channel_capacity as usize,
            handshake_timeout: Duration::from_secs(config.server.handshake_timeout_secs),
        }
    }
}

/// Accept connections on `listener` until `shutdown` resolves, then close
/// every registered connection and wait briefly for them to finish.
pub async fn serve<F>(
    listener: TcpListener,
    registry: Registry,
    settings: ConnectionSettings,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let registry = registry.clone();
                    connections.spawn(handle_socket(stream, addr, registry, settings));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            },

            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    let closed = registry.close_all(CloseReason::Shutdown).await;
    tracing::info!(closed, "Shutting down");

    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        tracing::warn!(remaining = connections.len(), "Aborting connections after grace period");
        connections.abort_all();
    }
}
