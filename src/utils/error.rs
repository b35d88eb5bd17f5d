//! Error type shared by every `nsgate` component.

use std::net::SocketAddr;

use config::ConfigError;
use thiserror::Error;

use crate::restart::RestartPhase;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid listen address {0}")]
    InvalidAddress(String),

    #[error("supervisor has no bound listener")]
    NotStarted,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("malformed message: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("unknown namespace {0}")]
    UnknownNamespace(String),

    #[error("connection limit of {0} reached")]
    CapacityReached(usize),

    #[error("connection {0} is closed")]
    ConnectionClosed(String),

    #[error("illegal restart transition {from:?} -> {to:?} (current phase {current:?})")]
    InvalidTransition {
        from: RestartPhase,
        to: RestartPhase,
        current: RestartPhase,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
