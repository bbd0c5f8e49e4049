//! Tracing and logging setup shared by every binary.

/// Initialize process-wide tracing with default settings.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(&TracingConfig::default());
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{InvalidLogFilter, LogFormat, TracingConfig, parse_level};
