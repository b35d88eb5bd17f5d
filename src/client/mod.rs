//! The `client` module defines the server-side record of a connected client.
//!
//! A `Connection` is created when a WebSocket upgrade on a known namespace
//! completes and lives in the `ConnectionRegistry` until the client leaves or
//! the gateway drains it during a restart.

pub mod connection;
pub use connection::{Connection, ConnectionId, DisconnectReason};

#[cfg(test)]
mod tests;
