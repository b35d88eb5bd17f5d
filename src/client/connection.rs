use std::fmt;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;
use tungstenite::protocol::frame::CloseFrame;
use tungstenite::protocol::frame::coding::CloseCode;
use uuid::Uuid;

use crate::router::Namespace;

pub type ConnectionId = String;

/// Represents a connected WebSocket client.
///
/// `sender` feeds the connection task that owns the socket; pushing a Close
/// frame through it makes that task close the socket and exit.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub namespace: Namespace,
    pub peer: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
    pub sender: UnboundedSender<WsMessage>,
}

impl Connection {
    /// Create a new connection with a fresh UUID.
    pub fn new(
        namespace: Namespace,
        peer: Option<SocketAddr>,
        sender: UnboundedSender<WsMessage>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            namespace,
            peer,
            connected_at: Utc::now(),
            sender,
        }
    }

    /// Queue a Close frame. Returns `false` when the connection task is gone.
    pub fn close(&self, code: CloseCode, reason: &str) -> bool {
        let frame = CloseFrame {
            code,
            reason: reason.to_string().into(),
        };
        self.sender.send(WsMessage::Close(Some(frame))).is_ok()
    }

    /// How long the connection has been open.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.connected_at
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the WebSocket or the TCP stream ended.
    ClientClosed,
    /// The peer sent a namespace-level `disconnect` message.
    ClientDisconnect,
    /// The server closed it, usually while draining for a restart.
    ServerClosed,
    /// No frame arrived within the heartbeat deadline.
    PingTimeout,
    TransportError,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisconnectReason::ClientClosed => "client closed",
            DisconnectReason::ClientDisconnect => "client disconnect",
            DisconnectReason::ServerClosed => "server closed",
            DisconnectReason::PingTimeout => "ping timeout",
            DisconnectReason::TransportError => "transport error",
        };
        f.write_str(s)
    }
}
