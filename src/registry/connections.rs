//! Connection registry
//!
//! Tracks every live connection and the namespace it joined.
//!
//! - Connection tasks `register` after the handshake and `remove` on the way
//!   out; removing an unknown id is a no-op so a task that was drained can
//!   still clean up after itself.
//! - `drain` empties the registry and queues a Close frame to each
//!   connection; the supervisor uses it to tear everything down on restart.
//! - The registry is synchronous and meant to sit behind a lock shared with
//!   the connection tasks. Never hold that lock across an `.await`.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};
use tungstenite::protocol::frame::coding::CloseCode;

use crate::client::{Connection, ConnectionId};
use crate::router::Namespace;
use crate::utils::{GatewayError, Result};

#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    max_connections: usize,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl ConnectionRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            max_connections,
        }
    }

    /// Adds a connection. Refused once `max_connections` are live.
    pub fn register(&mut self, connection: Connection) -> Result<()> {
        if self.connections.len() >= self.max_connections {
            warn!(
                sid = %connection.id,
                limit = self.max_connections,
                "connection limit reached"
            );
            return Err(GatewayError::CapacityReached(self.max_connections));
        }

        debug!(sid = %connection.id, namespace = %connection.namespace, "registered connection");
        self.connections.insert(connection.id.clone(), connection);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Connection> {
        let removed = self.connections.remove(id);
        if let Some(connection) = &removed {
            debug!(
                sid = id,
                namespace = %connection.namespace,
                age_ms = connection.age().num_milliseconds(),
                "removed connection"
            );
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn ids(&self) -> HashSet<ConnectionId> {
        self.connections.keys().cloned().collect()
    }

    /// Ids of the connections that joined `namespace`.
    pub fn in_namespace(&self, namespace: &Namespace) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| &c.namespace == namespace)
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn count_by_namespace(&self) -> HashMap<Namespace, usize> {
        let mut counts = HashMap::new();
        for connection in self.connections.values() {
            *counts.entry(connection.namespace.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Removes every connection and asks each one to close with `code`.
    /// Returns how many were drained.
    pub fn drain(&mut self, code: CloseCode, reason: &str) -> usize {
        let drained = self.connections.len();

        for (id, connection) in self.connections.drain() {
            if !connection.close(code, reason) {
                debug!(sid = %id, "connection task already gone while draining");
            }
        }

        if drained > 0 {
            info!(drained, "drained connections");
        }
        drained
    }
}
