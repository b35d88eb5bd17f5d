//! The `utils` module provides the pieces shared by every other module of
//! `nsgate`: the crate error type and logging initialisation.

pub mod error;
pub mod logging;

pub use error::{GatewayError, Result};
