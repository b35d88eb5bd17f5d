pub mod coordinator;

pub use coordinator::{RestartCoordinator, RestartPhase};

#[cfg(test)]
mod tests;
