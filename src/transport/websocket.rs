//! WebSocket transport
//!
//! One task per accepted TCP stream runs `handle_connection`:
//! - Upgrade to WebSocket; the request path picks the namespace and unknown
//!   namespaces are refused with 404 during the handshake
//! - Register a `Connection` with the registry (refused past the connection
//!   limit) and send the `connected` frame
//! - Run the namespace's handler set: `on_connect` once, `on_event` per
//!   event, `on_disconnect` once on the way out
//! - Multiplex inbound frames, frames queued through the connection's channel
//!   and the heartbeat timer on this single task
//!
//! A Close frame queued through the channel (see `ConnectionRegistry::drain`)
//! makes the task close the socket and exit.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::Message as WsMessage;
use tungstenite::protocol::frame::CloseFrame;
use tungstenite::protocol::frame::coding::CloseCode;

use crate::client::{Connection, ConnectionId, DisconnectReason};
use crate::config::HeartbeatSettings;
use crate::registry::SharedRegistry;
use crate::router::{HandlerSet, NamespaceRouter, Route, SocketHandle};
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::{GatewayError, Result};

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;

/// Everything a connection task needs from the gateway.
#[derive(Clone)]
pub struct ConnectionContext {
    pub router: Arc<NamespaceRouter>,
    pub registry: SharedRegistry,
    pub heartbeat: HeartbeatSettings,
}

/// Removes the connection from the registry however the task ends,
/// including when the supervisor aborts it.
struct RegistryGuard {
    registry: SharedRegistry,
    sid: ConnectionId,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.sid);
    }
}

pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: ConnectionContext,
) -> Result<()> {
    let mut route: Option<Route> = None;
    let mut rejected: Option<String> = None;

    let callback = |req: &Request, resp: Response| {
        let path = req.uri().path();
        match ctx.router.resolve(path) {
            Some(found) => {
                route = Some(found);
                Ok(resp)
            }
            None => {
                rejected = Some(path.to_string());
                Err(not_found(path))
            }
        }
    };

    let handshake = accept_hdr_async(stream, callback).await;
    let mut ws_stream = match (handshake, rejected) {
        (Ok(ws), _) => ws,
        (Err(_), Some(path)) => return Err(GatewayError::UnknownNamespace(path)),
        (Err(e), None) => return Err(e.into()),
    };
    let Some(Route {
        namespace,
        handlers,
    }) = route
    else {
        return Err(GatewayError::UnknownNamespace(String::new()));
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let connection = Connection::new(namespace.clone(), Some(peer), tx.clone());
    let sid = connection.id.clone();

    let registered = ctx.registry.lock().register(connection);
    if let Err(e) = registered {
        let refusal = frame(&ServerMessage::error(e.to_string()))?;
        ws_stream.send(refusal).await?;
        ws_stream
            .close(Some(CloseFrame {
                code: CloseCode::Again,
                reason: "connection limit reached".to_string().into(),
            }))
            .await?;
        return Err(e);
    }
    let _guard = RegistryGuard {
        registry: ctx.registry.clone(),
        sid: sid.clone(),
    };

    let hello = ServerMessage::Connected {
        sid: sid.clone(),
        namespace: namespace.to_string(),
        ping_interval: ctx.heartbeat.ping_interval_ms,
        ping_timeout: ctx.heartbeat.ping_timeout_ms,
    };
    ws_stream.send(frame(&hello)?).await?;

    info!(sid = %sid, namespace = %namespace, %peer, "websocket connection open");

    let socket = SocketHandle::new(sid, namespace, tx);
    handlers.on_connect(&socket);

    let reason = drive(ws_stream, &mut rx, &socket, handlers.as_ref(), ctx.heartbeat).await;

    handlers.on_disconnect(&socket, reason);
    Ok(())
}

/// Runs the connection until it ends and reports why.
async fn drive(
    ws_stream: WebSocketStream<TcpStream>,
    rx: &mut UnboundedReceiver<WsMessage>,
    socket: &SocketHandle,
    handlers: &dyn HandlerSet,
    heartbeat: HeartbeatSettings,
) -> DisconnectReason {
    let (mut sink, mut stream) = ws_stream.split();
    let mut last_seen = Instant::now();
    let mut ticker = interval_at(Instant::now() + heartbeat.interval(), heartbeat.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            inbound = stream.next() => {
                let msg = match inbound {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        debug!(sid = socket.id(), error = %e, "websocket read failed");
                        return DisconnectReason::TransportError;
                    }
                    None => return DisconnectReason::ClientClosed,
                };
                last_seen = Instant::now();

                match msg {
                    WsMessage::Text(text) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(ClientMessage::Event { event, args }) => {
                                handlers.on_event(socket, &event, &args);
                            }
                            Ok(ClientMessage::Disconnect) => {
                                if let Err(e) = sink.send(WsMessage::Close(None)).await {
                                    debug!(sid = socket.id(), error = %e, "close frame not delivered");
                                }
                                return DisconnectReason::ClientDisconnect;
                            }
                            Err(err) => {
                                warn!(
                                    sid = socket.id(),
                                    error = %err,
                                    text = %text.as_str().chars().take(100).collect::<String>(),
                                    "invalid client message"
                                );
                                let reply = ServerMessage::error(format!("invalid message: {err}"));
                                if !send_reply(&mut sink, &reply).await {
                                    return DisconnectReason::TransportError;
                                }
                            }
                        }
                    }
                    WsMessage::Binary(_) => {
                        warn!(sid = socket.id(), "binary frame rejected");
                        let reply = ServerMessage::error("binary frames are not supported");
                        if !send_reply(&mut sink, &reply).await {
                            return DisconnectReason::TransportError;
                        }
                    }
                    WsMessage::Close(_) => return DisconnectReason::ClientClosed,
                    // pings are answered by tungstenite; any frame counts as liveness
                    WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
                }
            }

            outbound = rx.recv() => match outbound {
                Some(WsMessage::Close(close)) => {
                    if let Err(e) = sink.send(WsMessage::Close(close)).await {
                        debug!(sid = socket.id(), error = %e, "close frame not delivered");
                    }
                    return DisconnectReason::ServerClosed;
                }
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        debug!(sid = socket.id(), error = %e, "websocket write failed");
                        return DisconnectReason::TransportError;
                    }
                }
                // unreachable while `socket` holds a sender, kept for completeness
                None => return DisconnectReason::ServerClosed,
            },

            _ = ticker.tick() => {
                if last_seen.elapsed() > heartbeat.deadline() {
                    warn!(sid = socket.id(), "heartbeat deadline missed");
                    let close = CloseFrame {
                        code: CloseCode::Policy,
                        reason: "ping timeout".to_string().into(),
                    };
                    if let Err(e) = sink.send(WsMessage::Close(Some(close))).await {
                        debug!(sid = socket.id(), error = %e, "close frame not delivered");
                    }
                    return DisconnectReason::PingTimeout;
                }
                if sink.send(WsMessage::Ping(Default::default())).await.is_err() {
                    return DisconnectReason::TransportError;
                }
            }
        }
    }
}

fn frame(message: &ServerMessage) -> Result<WsMessage> {
    Ok(WsMessage::text(serde_json::to_string(message)?))
}

async fn send_reply(sink: &mut WsSink, message: &ServerMessage) -> bool {
    match frame(message) {
        Ok(msg) => sink.send(msg).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "failed to encode reply");
            true
        }
    }
}

fn not_found(path: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(format!("unknown namespace {path}")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
