//! Connection directory: maps pairing tokens to their two role slots.
//!
//! Lock order is always directory first, then entry. Slot mutations for one
//! token are serialized by that token's entry mutex; different tokens never
//! contend beyond the brief directory lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, OwnedMutexGuard, RwLock};

use phonectl_common::{ConnectionId, PairingToken, RelayError, Role};

use crate::protocol::{Inbound, RelayNotice};


/// Why the relay is closing a connection on its own initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// A newer connection took over the same slot.
    Superseded,
    Shutdown,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::Superseded => "superseded",
            CloseReason::Shutdown => "server shutting down",
        }
    }
}

/// The registry's handle on one live socket.
///
/// Forwarded frames go through a bounded queue and may be dropped when it is
/// full. Relay notices use their own unbounded queue: there is at most one
/// per peer transition, and losing one would leave the peer with a stale
/// view of its partner. Closing is a third signal so it can never be stuck
/// behind either queue.
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
    notice_tx: mpsc::UnboundedSender<String>,
    close_tx: watch::Sender<Option<CloseReason>>,
}

impl ConnectionHandle {
    pub fn new(
        id: ConnectionId,
        tx: mpsc::Sender<String>,
        notice_tx: mpsc::UnboundedSender<String>,
        close_tx: watch::Sender<Option<CloseReason>>,
    ) -> Self {
        Self {
            id,
            tx,
            notice_tx,
            close_tx,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Live until the connection's task drops its receiving end.
    pub fn is_live(&self) -> bool {
        !self.tx.is_closed()
    }

    fn close(self, reason: CloseReason) {
        self.close_tx.send_replace(Some(reason));
    }

    fn notify(&self, notice: &RelayNotice) {
        if self.notice_tx.send(notice.to_text()).is_err() {
            tracing::debug!(conn = %self.id.short(), "Notice for closed connection discarded");
        }
    }
}

/// What happened to a routed frame that did not produce an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Forwarded,
    /// Dropped without telling the sender: an auth frame with nobody to
    /// receive it, or a peer whose outbound queue is full.
    Dropped,
}

/// Outcome of installing a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub superseded: bool,
    pub peer_live: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub tokens: usize,
    pub live_connections: usize,
}

struct Entry {
    controller: Option<ConnectionHandle>,
    desktop: Option<ConnectionHandle>,
    last_activity: Instant,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            controller: None,
            desktop: None,
            last_activity: Instant::now(),
        }
    }
}

impl Entry {
    fn slot(&self, role: Role) -> Option<&ConnectionHandle> {
        match role {
            Role::Controller => self.controller.as_ref(),
            Role::Desktop => self.desktop.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<ConnectionHandle> {
        match role {
            Role::Controller => &mut self.controller,
            Role::Desktop => &mut self.desktop,
        }
    }

    fn live_peer(&self, role: Role) -> Option<&ConnectionHandle> {
        self.slot(role.peer()).filter(|peer| peer.is_live())
    }

    fn is_empty(&self) -> bool {
        self.controller.is_none() && self.desktop.is_none()
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Thread-safe connection directory. Cloning shares the same directory.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Arc<RwLock<HashMap<String, Arc<Mutex<Entry>>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `conn` in the `(token, role)` slot.
    ///
    /// Any previous occupant is closed as superseded before the new one is
    /// stored. The new connection is told whether its peer is live, and a
    /// live peer is told about the arrival.
    pub async fn register(
        &self,
        token: &PairingToken,
        role: Role,
        conn: ConnectionHandle,
    ) -> Registration {
        let mut entry = self.lock_or_create(token).await;
        entry.touch();

        let slot = entry.slot_mut(role);
        let superseded = match slot.take() {
            Some(old) => {
                tracing::info!(
                    token = %token,
                    role = %role,
                    old = %old.id().short(),
                    new = %conn.id().short(),
                    "Superseding connection"
                );
                old.close(CloseReason::Superseded);
                true
            }
            None => false,
        };
        *slot = Some(conn);

        let peer_live = entry.live_peer(role).is_some();
        if let Some(me) = entry.slot(role) {
            me.notify(&RelayNotice::registered(role, peer_live));
        }
        if let Some(peer) = entry.live_peer(role) {
            peer.notify(&RelayNotice::peer_state(role.peer(), true));
        }

        Registration {
            superseded,
            peer_live,
        }
    }

    /// Forward a frame from `sender` to the opposite slot of `token`.
    ///
    /// Never waits on the peer: a full peer queue drops the frame.
    pub async fn route(
        &self,
        token: &PairingToken,
        sender: Role,
        inbound: Inbound,
    ) -> Result<Routed, RelayError> {
        let text = match inbound {
            Inbound::RelayStatus => {
                return Err(RelayError::MalformedMessage(
                    "relay_status is reserved for the relay".into(),
                ))
            }
            Inbound::Auth(text) => {
                let Some(entry) = self.get(token).await else {
                    return Ok(Routed::Dropped);
                };
                let mut entry = entry.lock().await;
                entry.touch();
                return Ok(match entry.slot(sender.peer()) {
                    Some(peer) => forward(peer, text, token, sender).unwrap_or(Routed::Dropped),
                    None => {
                        tracing::debug!(token = %token, role = %sender, "Auth with no peer, dropped");
                        Routed::Dropped
                    }
                });
            }
            Inbound::Opaque(text) => text,
        };

        let unavailable = RelayError::PeerUnavailable(sender.peer());
        let Some(entry) = self.get(token).await else {
            return Err(unavailable);
        };
        let mut entry = entry.lock().await;
        entry.touch();
        match entry.live_peer(sender) {
            Some(peer) => forward(peer, text, token, sender),
            None => Err(unavailable),
        }
    }

    /// Clear the `(token, role)` slot if `id` still owns it.
    ///
    /// Returns `false` for a stale close from a superseded connection, in
    /// which case the slot and the peer are left untouched.
    pub async fn unregister(&self, token: &PairingToken, role: Role, id: &ConnectionId) -> bool {
        let Some(entry) = self.get(token).await else {
            return false;
        };
        let mut entry = entry.lock().await;

        let slot = entry.slot_mut(role);
        if slot.as_ref().map(|c| c.id()) != Some(id) {
            return false;
        }
        *slot = None;
        entry.touch();

        if let Some(peer) = entry.live_peer(role) {
            peer.notify(&RelayNotice::peer_state(role.peer(), false));
        }
        true
    }

    /// Whether `(token, role)` currently holds a live connection.
    pub async fn is_live(&self, token: &PairingToken, role: Role) -> bool {
        match self.get(token).await {
            Some(entry) => entry.lock().await.slot(role).is_some_and(|c| c.is_live()),
            None => false,
        }
    }

    /// Forget tokens with no connections and no activity for `ttl`.
    /// Entries busy at the moment of the sweep are skipped until next time.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut map = self.entries.write().await;
        let before = map.len();
        map.retain(|_, entry| match entry.try_lock() {
            Ok(entry) => !(entry.is_empty() && entry.last_activity.elapsed() >= ttl),
            Err(_) => true,
        });
        let evicted = before - map.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = map.len(), "Evicted idle pairing entries");
        }
        evicted
    }

    /// Close every connection. Used on shutdown.
    pub async fn close_all(&self, reason: CloseReason) -> usize {
        let map = self.entries.write().await;
        let mut closed = 0;
        for entry in map.values() {
            let mut entry = entry.lock().await;
            for role in [Role::Controller, Role::Desktop] {
                if let Some(conn) = entry.slot_mut(role).take() {
                    conn.close(reason);
                    closed += 1;
                }
            }
        }
        closed
    }

    pub async fn stats(&self) -> RegistryStats {
        let map = self.entries.read().await;
        let mut stats = RegistryStats {
            tokens: map.len(),
            live_connections: 0,
        };
        for entry in map.values() {
            let entry = entry.lock().await;
            stats.live_connections += [Role::Controller, Role::Desktop]
                .into_iter()
                .filter(|role| entry.slot(*role).is_some_and(|c| c.is_live()))
                .count();
        }
        stats
    }

    async fn get(&self, token: &PairingToken) -> Option<Arc<Mutex<Entry>>> {
        self.entries.read().await.get(token.as_str()).cloned()
    }

    /// Lock the entry for `token`, creating it if needed. The entry lock is
    /// taken while the directory guard is still held, so an eviction sweep
    /// can never drop an entry between lookup and lock.
    async fn lock_or_create(&self, token: &PairingToken) -> OwnedMutexGuard<Entry> {
        {
            let map = self.entries.read().await;
            if let Some(entry) = map.get(token.as_str()) {
                return entry.clone().lock_owned().await;
            }
        }
        let mut map = self.entries.write().await;
        let entry = map.entry(token.as_str().to_string()).or_default().clone();
        entry.lock_owned().await
    }
}

fn forward(
    peer: &ConnectionHandle,
    text: String,
    token: &PairingToken,
    sender: Role,
) -> Result<Routed, RelayError> {
    match peer.tx.try_send(text) {
        Ok(()) => Ok(Routed::Forwarded),
        Err(TrySendError::Full(_)) => {
            tracing::warn!(
                token = %token,
                from = %sender,
                conn = %peer.id().short(),
                "Peer outbound queue full, dropping message"
            );
            Ok(Routed::Dropped)
        }
        Err(TrySendError::Closed(_)) => Err(RelayError::PeerUnavailable(sender.peer())),
    }
}
