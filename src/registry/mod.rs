pub mod connections;

use std::sync::Arc;

use parking_lot::Mutex;

pub use connections::ConnectionRegistry;

/// How the registry is shared between the supervisor and connection tasks.
pub type SharedRegistry = Arc<Mutex<ConnectionRegistry>>;

pub fn shared(max_connections: usize) -> SharedRegistry {
    Arc::new(Mutex::new(ConnectionRegistry::new(max_connections)))
}
