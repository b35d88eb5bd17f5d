//! # nsgate
//!
//! `nsgate` is a restart-safe realtime connection gateway built with Rust.
//! Clients connect over WebSockets to one of several namespaces, and any of
//! them can ask the gateway to drain every connection and re-bind its
//! listener without the process exiting.
//!
//! ## Core Modules
//!
//! - `client`: The server-side record of a connected client.
//! - `config`: Loads settings from defaults, `config/default.toml` and the environment.
//! - `harness`: A small client that connects to a gateway and logs what it sees.
//! - `registry`: Tracks live connections and drains them on restart.
//! - `restart`: The restart state machine.
//! - `router`: Maps namespaces to handler sets.
//! - `server`: Owns the listener; start, stop and rebind.
//! - `transport`: The wire protocol and the per-connection WebSocket task.
//! - `utils`: Error type and logging.

pub mod client;
pub mod config;
pub mod harness;
pub mod registry;
pub mod restart;
pub mod router;
pub mod server;
pub mod transport;
pub mod utils;
