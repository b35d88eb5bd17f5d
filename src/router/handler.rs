use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};
use tungstenite::protocol::Message as WsMessage;
use tungstenite::protocol::frame::CloseFrame;
use tungstenite::protocol::frame::coding::CloseCode;

use crate::client::{ConnectionId, DisconnectReason};
use crate::restart::RestartCoordinator;
use crate::router::Namespace;
use crate::transport::message::ServerMessage;
use crate::utils::{GatewayError, Result};

/// Callbacks run for the connections of a namespace.
///
/// A single implementation may be registered under several namespaces; the
/// namespace is available from the `SocketHandle` when it matters.
pub trait HandlerSet: Send + Sync {
    /// Called exactly once per connection, right after the handshake.
    fn on_connect(&self, _socket: &SocketHandle) {}

    fn on_event(&self, socket: &SocketHandle, event: &str, args: &[Value]);

    fn on_disconnect(&self, _socket: &SocketHandle, _reason: DisconnectReason) {}
}

/// What a handler gets to talk back to one connection.
#[derive(Debug, Clone)]
pub struct SocketHandle {
    id: ConnectionId,
    namespace: Namespace,
    sender: UnboundedSender<WsMessage>,
}

impl SocketHandle {
    pub fn new(id: ConnectionId, namespace: Namespace, sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id,
            namespace,
            sender,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Sends an `event` message to this client.
    pub fn emit(&self, event: &str, args: Vec<Value>) -> Result<()> {
        let message = ServerMessage::Event {
            event: event.to_string(),
            args,
        };
        self.send(&message)
    }

    pub(crate) fn send(&self, message: &ServerMessage) -> Result<()> {
        let text = serde_json::to_string(message)?;
        self.sender
            .send(WsMessage::text(text))
            .map_err(|_| GatewayError::ConnectionClosed(self.id.clone()))
    }

    /// Asks the connection task to close the socket.
    pub fn close(&self, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_string().into(),
        };
        self.sender
            .send(WsMessage::Close(Some(frame)))
            .map_err(|_| GatewayError::ConnectionClosed(self.id.clone()))
    }
}

/// The gateway's own handler set: logs connection lifecycle with the
/// namespace as context and turns the restart event into a restart request.
#[derive(Debug, Clone)]
pub struct GatewayHandlers {
    coordinator: RestartCoordinator,
    restart_event: String,
}

impl GatewayHandlers {
    pub fn new(coordinator: RestartCoordinator, restart_event: impl Into<String>) -> Self {
        Self {
            coordinator,
            restart_event: restart_event.into(),
        }
    }
}

impl HandlerSet for GatewayHandlers {
    fn on_connect(&self, socket: &SocketHandle) {
        info!(sid = socket.id(), namespace = %socket.namespace(), "client connected");
    }

    fn on_event(&self, socket: &SocketHandle, event: &str, args: &[Value]) {
        if event != self.restart_event {
            info!(
                sid = socket.id(),
                namespace = %socket.namespace(),
                event,
                args = args.len(),
                "ignoring unhandled event"
            );
            return;
        }

        if self.coordinator.request() {
            info!(sid = socket.id(), namespace = %socket.namespace(), "restart requested");
        } else {
            warn!(
                sid = socket.id(),
                namespace = %socket.namespace(),
                phase = ?self.coordinator.phase(),
                "restart already in progress; request ignored"
            );
        }
    }

    fn on_disconnect(&self, socket: &SocketHandle, reason: DisconnectReason) {
        info!(sid = socket.id(), namespace = %socket.namespace(), %reason, "client disconnected");
    }
}
