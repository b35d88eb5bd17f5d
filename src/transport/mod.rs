//! The `transport` module handles network communication with clients over
//! WebSockets.
//!
//! It defines the JSON messages exchanged with clients and the per-connection
//! task that performs the namespace handshake, heartbeat and event dispatch.

pub mod message;
pub mod websocket;

pub use message::{ClientMessage, ServerMessage};
pub use websocket::{ConnectionContext, handle_connection};
