//! Background sweep that forgets pairing tokens nobody is using.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::registry::Registry;

/// Every `interval`, evict entries with no connections idle for `ttl`.
pub fn spawn_reaper(registry: Registry, ttl: Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.evict_idle(ttl).await;
            let stats = registry.stats().await;
            tracing::debug!(
                tokens = stats.tokens,
                live = stats.live_connections,
                "Reaper tick"
            );
        }
    })
}
