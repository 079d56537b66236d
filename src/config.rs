//! Environment-driven configuration, with typed defaults and fail-fast
//! validation.
//!
//! Only the process environment is read here — no config file support.
//! Each variable is parsed eagerly in [`Config::from_env`] and any parse
//! failure or out-of-range value is reported as a [`ConfigError`] rather
//! than silently falling back to the default, so a typo'd env var fails
//! the process at startup instead of at the first request that needs it.

use crate::error::ConfigError;
use std::env;
use std::time::Duration;

const DEFAULT_PORT: u16 = 5050;
const DEFAULT_MAX_ITEMS: usize = 100;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// The cache daemon's runtime configuration.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Listener port, bound on all interfaces.
    pub port: u16,
    /// Maximum number of live entries before LFU eviction kicks in.
    pub max_items: usize,
    /// Cadence of the periodic expiration sweep.
    pub cleanup_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_items: DEFAULT_MAX_ITEMS,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment, falling back to the
    /// documented defaults (port 5050, 100 items, 60s sweep) for any variable
    /// that's unset.
    ///
    /// Returns [`ConfigError`] for a non-positive `CACHE_MAX_ITEMS` or any
    /// variable that's present but fails to parse — both are fatal
    /// configuration faults the caller should surface as a non-zero exit.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(raw) = env::var("CACHE_PORT") {
            config.port = raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnvVar {
                    name: "CACHE_PORT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        if let Ok(raw) = env::var("CACHE_MAX_ITEMS") {
            let parsed: i64 = raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnvVar {
                    name: "CACHE_MAX_ITEMS",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            if parsed <= 0 {
                return Err(ConfigError::InvalidMaxItems(parsed));
            }
            config.max_items = parsed as usize;
        }

        if let Ok(raw) = env::var("CACHE_CLEANUP_INTERVAL_SECS") {
            let secs: u64 = raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnvVar {
                    name: "CACHE_CLEANUP_INTERVAL_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            config.cleanup_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
