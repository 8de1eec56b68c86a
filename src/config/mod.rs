//! Typed configuration from environment variables or a TOML file.
//!
//! Loads once at startup and fails fast on malformed values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::KitchenConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database file. In-memory storage when unset.
    pub db_path: Option<PathBuf>,
    /// How long a cook takes per order, in milliseconds.
    pub serving_ms: u64,
    /// Number of cooks the server starts.
    pub cooks: usize,
    /// Idle backoff of a polling loop, in milliseconds.
    pub poll_ms: u64,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let kitchen = KitchenConfig::default();
        Self {
            db_path: None,
            serving_ms: kitchen.serving_duration.as_millis() as u64,
            cooks: kitchen.pool_size,
            poll_ms: kitchen.poll_interval.as_millis() as u64,
            otel_endpoint: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup. Unset
    /// variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            db_path: lookup("KIOSK_DB_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            serving_ms: parse_var(&lookup, "KIOSK_SERVING_MS")?.unwrap_or(defaults.serving_ms),
            cooks: parse_var(&lookup, "KIOSK_COOKS")?.unwrap_or(defaults.cooks),
            poll_ms: parse_var(&lookup, "KIOSK_POLL_MS")?.unwrap_or(defaults.poll_ms),
            otel_endpoint: lookup("OTEL_ENDPOINT").filter(|v| !v.is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.serving_ms == 0 {
            return Err(Error::Config("serving duration must be positive".to_string()));
        }
        if self.poll_ms == 0 {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }
        Ok(())
    }

    /// The settings the kitchen runs with.
    pub fn kitchen_config(&self) -> KitchenConfig {
        KitchenConfig {
            serving_duration: Duration::from_millis(self.serving_ms),
            pool_size: self.cooks,
            poll_interval: Duration::from_millis(self.poll_ms),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("invalid value for {name}: {e}"))),
    }
}
