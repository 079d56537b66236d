//! Typed errors for the parts of the crate that must distinguish failure kinds
//! rather than fold them into a response record.
//!
//! User-input faults (blank key, duplicate key, invalid operation) and
//! transport faults never reach this type — they're reported as
//! `Response { success: false, .. }` or a logged session close, per the
//! error-handling design. `ConfigError` exists for the one class of fault that
//! is genuinely fatal at startup.

use thiserror::Error;

/// A configuration fault discovered while loading [`crate::config::Config`].
///
/// Every variant here is fatal: the process should log it and exit non-zero
/// rather than attempt to run with an invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `CACHE_MAX_ITEMS` was present but not a positive integer, or was
    /// defaulted to a non-positive value.
    #[error("cache.maxItems must be a positive integer, got {0}")]
    InvalidMaxItems(i64),

    /// An environment variable was present but could not be parsed as its
    /// expected type.
    #[error("environment variable {name} has invalid value {value:?}: {reason}")]
    InvalidEnvVar {
        /// Name of the offending environment variable.
        name: &'static str,
        /// The raw string value that failed to parse.
        value: String,
        /// Why parsing failed.
        reason: String,
    },
}
