//! Tracing/logging initialization.
//!
//! `RUST_LOG` takes precedence over the configured level when set.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log format '{0}' (expected 'json' or 'pretty')")]
pub struct UnknownLogFormat(pub String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid log filter '{directive}': {reason}")]
pub struct InvalidLogFilter {
    pub directive: String,
    pub reason: String,
}

/// Check a filter directive such as `"info"` or `"emporium_hierarchy=debug"`
/// and return it trimmed.
pub fn parse_level(raw: &str) -> Result<String, InvalidLogFilter> {
    let directive = raw.trim();
    if directive.is_empty() {
        return Err(InvalidLogFilter {
            directive: directive.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    EnvFilter::try_new(directive).map_err(|e| InvalidLogFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })?;
    Ok(directive.to_string())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable multi-line output for local runs.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(UnknownLogFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracingConfig {
    pub format: LogFormat,
    /// Default filter directive, e.g. `"info"` or `"emporium_hierarchy=debug"`.
    pub level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: &TracingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
