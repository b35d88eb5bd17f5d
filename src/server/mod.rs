//! The `server` module owns the network listener and its lifecycle,
//! including draining and rebinding on restart.

pub mod supervisor;

pub use supervisor::Supervisor;
