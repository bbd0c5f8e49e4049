//! Configuration loading and representation.
//!
//! Settings are read once at startup and passed explicitly into the
//! components that need them.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use emporium_auth::MergePolicy;
use emporium_observability::{LogFormat, TracingConfig, parse_level};

pub const ENV_PERMISSION_MERGE: &str = "EMPORIUM_PERMISSION_MERGE";
pub const ENV_SEED_DEFAULTS: &str = "EMPORIUM_SEED_DEFAULTS";
pub const ENV_LOG_FORMAT: &str = "EMPORIUM_LOG_FORMAT";
pub const ENV_LOG_LEVEL: &str = "EMPORIUM_LOG_LEVEL";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// How rule sets from several roles combine.
    pub permission_merge: MergePolicy,
    /// Seed the default entity catalogue and admin roles on startup.
    pub seed_defaults: bool,
    pub tracing: TracingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            permission_merge: MergePolicy::Union,
            seed_defaults: true,
            tracing: TracingConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(raw) = lookup(ENV_PERMISSION_MERGE) {
            settings.permission_merge = parse(ENV_PERMISSION_MERGE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SEED_DEFAULTS) {
            settings.seed_defaults = parse_bool(ENV_SEED_DEFAULTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            settings.tracing.format = parse::<LogFormat>(ENV_LOG_FORMAT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            settings.tracing.level = parse_level(&raw).map_err(|e| ConfigError::Invalid {
                var: ENV_LOG_LEVEL,
                message: e.to_string(),
            })?;
        }

        Ok(settings)
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        message: e.to_string(),
    })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}
