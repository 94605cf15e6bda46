//! Relay-level wire protocol.
//!
//! Inbound frames are classified by their `type` field only; the text of
//! anything the relay forwards is never re-serialized. Outbound notices are
//! the only JSON the relay itself produces.

use serde::Serialize;

use phonectl_common::{RelayError, Role};

/// A text frame received from a peer, classified by `type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `type: "auth"`. Relayed to the peer if one is registered, live or not.
    Auth(String),
    /// `type: "relay_status"`. Only the relay may emit this.
    RelayStatus,
    /// Any other JSON object, including peer-reported errors.
    Opaque(String),
}

impl Inbound {
    /// Classify a frame. The frame must be a single JSON object.
    pub fn parse(text: String) -> Result<Self, RelayError> {
        let object: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&text).map_err(|e| RelayError::MalformedMessage(e.to_string()))?;

        Ok(match object.get("type").and_then(serde_json::Value::as_str) {
            Some("auth") => Inbound::Auth(text),
            Some("relay_status") => Inbound::RelayStatus,
            _ => Inbound::Opaque(text),
        })
    }
}

/// Messages the relay sends on its own behalf.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayNotice {
    RelayStatus(RelayStatus),
    Error(ErrorNotice),
}

/// Peer liveness report. Exactly one of `pc_connected` / `phone_connected`
/// is set: the one describing the recipient's peer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RelayStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pc_connected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_connected: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorNotice {
    pub error: String,
    pub code: &'static str,
}

impl RelayNotice {
    /// Sent to a connection right after it is installed in its slot.
    pub fn registered(role: Role, peer_live: bool) -> Self {
        let mut status = RelayStatus {
            status: Some("registered"),
            role: Some(role),
            ..RelayStatus::default()
        };
        status.set_peer(role, peer_live);
        RelayNotice::RelayStatus(status)
    }

    /// Tells `recipient` whether its peer is now online.
    pub fn peer_state(recipient: Role, online: bool) -> Self {
        let mut status = RelayStatus::default();
        status.set_peer(recipient, online);
        RelayNotice::RelayStatus(status)
    }

    pub fn error(err: &RelayError) -> Self {
        RelayNotice::Error(ErrorNotice {
            error: err.wire_message(),
            code: err.code(),
        })
    }

    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize relay notice");
            r#"{"type":"error","error":"internal relay error","code":"internal"}"#.to_string()
        })
    }
}

impl RelayStatus {
    fn set_peer(&mut self, recipient: Role, online: bool) {
        match recipient.peer() {
            Role::Desktop => self.pc_connected = Some(online),
            Role::Controller => self.phone_connected = Some(online),
        }
    }
}
