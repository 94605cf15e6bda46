//! Connection-time parameters: `?token=<token>&client=<pc|phone>`.

use phonectl_common::{PairingToken, RelayError, Role};

/// Who a freshly upgraded socket claims to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub token: PairingToken,
    pub role: Role,
}

/// Parse the query string of the upgrade request.
///
/// Both keys must be present; the first occurrence of each wins. Values are
/// percent-decoded and `+` is read as a space.
pub fn parse_query(query: Option<&str>) -> Result<Pairing, RelayError> {
    let mut token = None;
    let mut client = None;

    for pair in query.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let slot = match decode(key)?.as_str() {
            "token" => &mut token,
            "client" => &mut client,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(decode(value)?);
        }
    }

    let token = token.ok_or_else(|| RelayError::MalformedHandshake("missing token".into()))?;
    let token = PairingToken::new(token)?;

    let client = client.ok_or_else(|| RelayError::MalformedHandshake("missing client".into()))?;
    let role = Role::from_client_param(&client).ok_or_else(|| {
        RelayError::MalformedHandshake(format!("invalid client {client:?}, expected pc or phone"))
    })?;

    Ok(Pairing { token, role })
}

fn decode(raw: &str) -> Result<String, RelayError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|e| RelayError::MalformedHandshake(format!("bad query encoding: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake_error(query: Option<&str>) -> String {
        match parse_query(query).unwrap_err() {
            RelayError::MalformedHandshake(msg) => msg,
            other => panic!("expected MalformedHandshake, got {other:?}"),
        }
    }

    #[test]
    fn parses_pc_and_phone() {
        let pairing = parse_query(Some("token=abc&client=pc")).unwrap();
        assert_eq!(pairing.token.as_str(), "abc");
        assert_eq!(pairing.role, Role::Desktop);

        let pairing = parse_query(Some("client=phone&token=abc")).unwrap();
        assert_eq!(pairing.role, Role::Controller);
    }

    #[test]
    fn decodes_token() {
        let pairing = parse_query(Some("token=a%2Fb+c%3D&client=pc")).unwrap();
        assert_eq!(pairing.token.as_str(), "a/b c=");
    }

    #[test]
    fn ignores_unknown_keys_and_keeps_first_value() {
        let pairing = parse_query(Some("v=2&token=first&token=second&client=phone&x")).unwrap();
        assert_eq!(pairing.token.as_str(), "first");
    }

    #[test]
    fn missing_parameters() {
        assert_eq!(handshake_error(None), "missing token");
        assert_eq!(handshake_error(Some("")), "missing token");
        assert_eq!(handshake_error(Some("client=pc")), "missing token");
        assert_eq!(handshake_error(Some("token=abc")), "missing client");
    }

    #[test]
    fn empty_token_rejected() {
        assert_eq!(handshake_error(Some("token=&client=pc")), "empty token");
        assert_eq!(handshake_error(Some("token&client=pc")), "empty token");
    }

    #[test]
    fn invalid_client_rejected() {
        let msg = handshake_error(Some("token=abc&client=tablet"));
        assert!(msg.contains("tablet"));
    }
}
