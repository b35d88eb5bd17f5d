use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "event")]
    Event {
        event: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    /// Leave the namespace; the server closes the socket.
    #[serde(rename = "disconnect")]
    Disconnect,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// First frame after the upgrade.
    #[serde(rename = "connected")]
    Connected {
        sid: String,
        namespace: String,
        ping_interval: u64,
        ping_timeout: u64,
    },
    #[serde(rename = "event")]
    Event { event: String, args: Vec<Value> },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
