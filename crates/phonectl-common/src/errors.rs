use std::path::PathBuf;

use crate::types::Role;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Missing or invalid `token` / `client` at connect time.
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// No live peer in the opposite slot. Carries the role that is missing.
    #[error("{} not connected", .0.display_name())]
    PeerUnavailable(Role),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Text carried in the `error` field of a synthetic error envelope.
    pub fn wire_message(&self) -> String {
        match self {
            RelayError::PeerUnavailable(role) => format!("{} not connected", role.display_name()),
            RelayError::MalformedMessage(_) => "Invalid message format".to_string(),
            other => other.to_string(),
        }
    }

    /// Machine-readable code carried next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::MalformedHandshake(_) => "malformed_handshake",
            RelayError::MalformedMessage(_) => "malformed_message",
            RelayError::PeerUnavailable(_) => "peer_unavailable",
            RelayError::Transport(_) => "transport_error",
            RelayError::Config(_) => "config_error",
            RelayError::Io(_) => "io_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("server.port = 0".into());
        assert_eq!(err.to_string(), "config validation error: server.port = 0");
    }

    #[test]
    fn peer_unavailable_wire_message_names_missing_side() {
        let err = RelayError::PeerUnavailable(Role::Desktop);
        assert_eq!(err.wire_message(), "PC not connected");
        assert_eq!(err.code(), "peer_unavailable");

        let err = RelayError::PeerUnavailable(Role::Controller);
        assert_eq!(err.wire_message(), "Phone not connected");
    }

    #[test]
    fn malformed_message_hides_parser_detail_on_the_wire() {
        let err = RelayError::MalformedMessage("expected value at line 1 column 1".into());
        assert_eq!(err.wire_message(), "Invalid message format");
        assert!(err.to_string().contains("line 1 column 1"));
        assert_eq!(err.code(), "malformed_message");
    }

    #[test]
    fn relay_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: RelayError = config_err.into();
        assert!(matches!(err, RelayError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn relay_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: RelayError = io_err.into();
        assert!(matches!(err, RelayError::Io(_)));
        assert_eq!(err.code(), "io_error");
    }
}
