//! Client harness
//!
//! Connects to a gateway namespace and logs what happens on the wire: the
//! HTTP upgrade, the `connected` handshake, every server message and the
//! close. Optionally emits the restart event once the handshake arrives.
//! Used by the `client` subcommand and by the end-to-end tests.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tracing::{info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::router::Namespace;
use crate::transport::message::ServerMessage;
use crate::utils::Result;

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Gateway base URL, e.g. `ws://127.0.0.1:8080`.
    pub url: String,
    pub namespace: String,
    /// Event to emit right after the handshake.
    pub emit: Option<String>,
    /// How long to wait for the server before closing from our side.
    pub linger: Duration,
}

#[derive(Debug, Default)]
pub struct HarnessReport {
    /// HTTP status of the upgrade response.
    pub status: u16,
    pub sid: Option<String>,
    pub messages: Vec<ServerMessage>,
    pub closed_by_server: bool,
}

pub async fn run(options: &HarnessOptions) -> Result<HarnessReport> {
    let namespace = Namespace::parse(&options.namespace);
    let url = format!("{}{}", options.url.trim_end_matches('/'), namespace);

    let (mut ws, response) = connect_async(url.as_str()).await?;
    let status = response.status().as_u16();
    info!(
        %url,
        status,
        accept = ?response.headers().get("sec-websocket-accept"),
        "transport upgraded to websocket"
    );

    let mut report = HarnessReport {
        status,
        ..Default::default()
    };

    let linger = sleep(options.linger);
    tokio::pin!(linger);

    loop {
        tokio::select! {
            incoming = ws.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(ServerMessage::Connected { sid, namespace, ping_interval, ping_timeout }) => {
                            info!(%sid, %namespace, ping_interval, ping_timeout, "handshake received");
                            report.sid = Some(sid);
                            if let Some(event) = &options.emit {
                                let msg = json!({ "type": "event", "event": event, "args": [] });
                                ws.send(WsMessage::text(msg.to_string())).await?;
                                info!(%event, "event emitted");
                            }
                        }
                        Ok(other) => {
                            info!(message = ?other, "server message");
                            report.messages.push(other);
                        }
                        Err(e) => warn!(error = %e, "unparseable server message"),
                    }
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(?frame, "server closed the connection");
                    report.closed_by_server = true;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "connection lost");
                    report.closed_by_server = true;
                    break;
                }
                None => {
                    info!("connection ended");
                    report.closed_by_server = true;
                    break;
                }
            },
            _ = &mut linger => {
                info!("linger elapsed; closing");
                let _ = ws.close(None).await;
                break;
            }
        }
    }

    Ok(report)
}
