//! Infrastructure layer: configuration and the composition root wiring the
//! authorization gate in front of every admin operation.

pub mod config;
pub mod services;

#[cfg(test)]
mod integration_tests;

pub use config::{ConfigError, Settings};
pub use services::AdminServices;
