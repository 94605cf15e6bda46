//! Pairing domain types shared by the relay and its configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::RelayError;

/// Which side of a pairing a connection speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The phone issuing commands.
    #[serde(rename = "phone")]
    Controller,
    /// The desktop agent executing them.
    #[serde(rename = "pc")]
    Desktop,
}

impl Role {
    /// Parse the `client` connection parameter.
    pub fn from_client_param(value: &str) -> Option<Self> {
        match value {
            "phone" => Some(Role::Controller),
            "pc" => Some(Role::Desktop),
            _ => None,
        }
    }

    pub fn peer(self) -> Self {
        match self {
            Role::Controller => Role::Desktop,
            Role::Desktop => Role::Controller,
        }
    }

    /// Name used on the wire (`client` parameter, `role` field).
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::Controller => "phone",
            Role::Desktop => "pc",
        }
    }

    /// Name used in human-readable error text.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::Controller => "Phone",
            Role::Desktop => "PC",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Opaque partition key shared by both peers of a pairing.
///
/// Any non-empty string is accepted. `Display` only shows a short prefix so
/// tokens never end up in logs verbatim; use [`PairingToken::as_str`] for the
/// real value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairingToken(String);

impl PairingToken {
    pub fn new(value: impl Into<String>) -> Result<Self, RelayError> {
        let value = value.into();
        if value.is_empty() {
            return Err(RelayError::MalformedHandshake("empty token".into()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(3).collect();
        write!(f, "{prefix}***")
    }
}
