//! # Runtime Configuration Module
//!
//! Environment-driven settings consulted by the request pipeline and by
//! [`create_routes`](crate::routing::create_routes).
//!
//! ## Environment Variables
//!
//! ### `BRRTR_DEBUG`
//!
//! Debug mode. Unrecognised errors propagate to the router instead of being
//! turned into a generic 500, and response validation failures are raised.
//!
//! Default: off
//!
//! ### `BRRTR_RAISE_RESPONSE_VALIDATION_ERRORS`
//!
//! Raise response validation failures as 400 errors instead of only logging
//! them.
//!
//! Default: off
//!
//! ### `BRRTR_MAX_RESPONSE_LENGTH`
//!
//! Maximum number of characters of a response body included in the response
//! validation warning. Longer bodies are truncated and suffixed with `...`.
//!
//! Default: `8000`
//!
//! Flags are on for any non-empty value other than `0`, `false`, `off` or `no`
//! (case-insensitive).
//!
//! ## Usage
//!
//! ```rust
//! use brrtlogic::runtime_config::Settings;
//!
//! let settings = Settings::from_lookup(|key| match key {
//!     "BRRTR_DEBUG" => Some("1".to_string()),
//!     _ => None,
//! });
//! assert!(settings.debug);
//! assert!(!settings.raise_response_validation_errors);
//! assert_eq!(settings.max_response_length, 8000);
//! ```

use std::env;

/// Default limit for response bodies quoted in log records.
pub const DEFAULT_MAX_RESPONSE_LENGTH: usize = 8000;

pub const ENV_DEBUG: &str = "BRRTR_DEBUG";
pub const ENV_RAISE_RESPONSE_VALIDATION_ERRORS: &str = "BRRTR_RAISE_RESPONSE_VALIDATION_ERRORS";
pub const ENV_MAX_RESPONSE_LENGTH: &str = "BRRTR_MAX_RESPONSE_LENGTH";

/// Pipeline settings loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub debug: bool,
    pub raise_response_validation_errors: bool,
    pub max_response_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            raise_response_validation_errors: false,
            max_response_length: DEFAULT_MAX_RESPONSE_LENGTH,
        }
    }
}

fn flag(value: Option<String>) -> bool {
    match value {
        Some(v) => {
            let v = v.trim().to_ascii_lowercase();
            !v.is_empty() && !matches!(v.as_str(), "0" | "false" | "off" | "no")
        }
        None => false,
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_response_length = lookup(ENV_MAX_RESPONSE_LENGTH)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_RESPONSE_LENGTH);
        Settings {
            debug: flag(lookup(ENV_DEBUG)),
            raise_response_validation_errors: flag(lookup(ENV_RAISE_RESPONSE_VALIDATION_ERRORS)),
            max_response_length,
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_raise_response_validation_errors(mut self, raise: bool) -> Self {
        self.raise_response_validation_errors = raise;
        self
    }
}
