//! Per-connection handler: upgrade, identify, register, then forward.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

use phonectl_common::{ConnectionId, RelayError};

use crate::handshake::{parse_query, Pairing};
use crate::protocol::{Inbound, RelayNotice};
use crate::registry::{CloseReason, ConnectionHandle, Registry};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Per-connection limits, shared by every handler.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub channel_capacity: usize,
    pub handshake_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// How the forwarding loop ended.
enum Exit {
    /// Peer closed, or the socket failed.
    Remote,
    /// The registry asked us to close.
    Relay(CloseReason),
}

/// Drive one accepted TCP stream until it closes.
pub async fn handle_socket(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Registry,
    settings: ConnectionSettings,
) {
    let mut query: Option<String> = None;
    let capture = |req: &Request, resp: Response| {
        query = req.uri().query().map(str::to_owned);
        Ok::<_, ErrorResponse>(resp)
    };

    let ws = match tokio::time::timeout(settings.handshake_timeout, accept_hdr_async(stream, capture))
        .await
    {
        Ok(Ok(ws)) => ws,
        Ok(Err(e)) => {
            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
            return;
        }
        Err(_) => {
            tracing::warn!(peer = %addr, "WS handshake timeout");
            return;
        }
    };

    let (mut sink, stream) = ws.split();

    let pairing = match parse_query(query.as_deref()) {
        Ok(pairing) => pairing,
        Err(e) => {
            tracing::warn!(peer = %addr, error = %e, "Rejecting connection");
            let reason = match &e {
                RelayError::MalformedHandshake(msg) => msg.clone(),
                other => other.to_string(),
            };
            let _ = send_close(&mut sink, CloseCode::Policy, reason).await;
            return;
        }
    };

    run(sink, stream, addr, pairing, registry, settings.channel_capacity).await;
}

async fn run(
    mut sink: WsSink,
    mut stream: SplitStream<WebSocketStream<TcpStream>>,
    addr: SocketAddr,
    pairing: Pairing,
    registry: Registry,
    capacity: usize,
) {
    let Pairing { token, role } = pairing;
    let id = ConnectionId::new();
    let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<String>();
    let (close_tx, mut close_rx) = watch::channel(None);

    let handle = ConnectionHandle::new(id.clone(), tx, notice_tx, close_tx);
    let registration = registry.register(&token, role, handle).await;

    tracing::info!(
        peer = %addr,
        token = %token,
        role = %role,
        conn = %id.short(),
        superseded = registration.superseded,
        peer_live = registration.peer_live,
        "Client registered"
    );

    let exit = loop {
        tokio::select! {
            biased;

            _ = close_rx.changed() => {
                let reason = close_rx.borrow().unwrap_or(CloseReason::Shutdown);
                break Exit::Relay(reason);
            }

            // Relay notices go out ahead of forwarded traffic.
            Some(notice) = notice_rx.recv() => {
                if let Err(e) = sink.send(Message::Text(notice.into())).await {
                    tracing::debug!(peer = %addr, error = %e, "WS send failed");
                    break Exit::Remote;
                }
            }

            // Frames forwarded from the peer.
            Some(text) = rx.recv() => {
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    tracing::debug!(peer = %addr, error = %e, "WS send failed");
                    break Exit::Remote;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let routed = match Inbound::parse(text.to_string()) {
                            Ok(inbound) => registry.route(&token, role, inbound).await,
                            Err(e) => Err(e),
                        };
                        if let Err(e) = routed {
                            tracing::debug!(token = %token, role = %role, error = %e, "Route failed");
                            if send_notice(&mut sink, &RelayNotice::error(&e)).await.is_err() {
                                break Exit::Remote;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let e = RelayError::MalformedMessage("binary frames are not supported".into());
                        if send_notice(&mut sink, &RelayNotice::error(&e)).await.is_err() {
                            break Exit::Remote;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break Exit::Remote,
                    Some(Err(e)) => {
                        let e = RelayError::Transport(e.to_string());
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break Exit::Remote;
                    }
                    _ => {}
                }
            }
        }
    };

    // Drop our queue first so routing sees this connection as gone even if
    // the close below stalls.
    drop(rx);
    drop(notice_rx);
    let cleared = registry.unregister(&token, role, &id).await;

    match exit {
        Exit::Relay(reason) => {
            tracing::info!(
                peer = %addr,
                token = %token,
                role = %role,
                conn = %id.short(),
                reason = reason.as_str(),
                "Closing connection"
            );
            let _ = send_close(&mut sink, CloseCode::Normal, reason.as_str().to_string()).await;
        }
        Exit::Remote => {
            tracing::info!(
                peer = %addr,
                token = %token,
                role = %role,
                conn = %id.short(),
                cleared,
                "Client disconnected"
            );
            let _ = sink.close().await;
        }
    }
}

async fn send_notice(
    sink: &mut WsSink,
    notice: &RelayNotice,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    sink.send(Message::Text(notice.to_text().into())).await
}

async fn send_close(
    sink: &mut WsSink,
    code: CloseCode,
    reason: String,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    sink.send(Message::Close(Some(CloseFrame {
        code,
        reason: reason.into(),
    })))
    .await
}
