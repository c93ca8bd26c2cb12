//! Mediator configuration.
//!
//! Defaults suit most applications; deployments can override them through
//! environment variables:
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `COURIER_DUPLICATE_HANDLERS` | `replace` / `reject` | `replace` |
//! | `COURIER_LOG_PAYLOADS` | `true` / `false` | `true` |
//! | `COURIER_SLOW_REQUEST_MS` | milliseconds | `500` |
//!
//! # Example
//!
//! ```no_run
//! use courier_runtime::config::MediatorConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MediatorConfig::from_env()?;
//! println!("slow threshold: {:?}", config.logging.slow_request_threshold);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Environment variable selecting the [`DuplicatePolicy`]
pub const DUPLICATE_HANDLERS_VAR: &str = "COURIER_DUPLICATE_HANDLERS";
/// Environment variable toggling payload logging
pub const LOG_PAYLOADS_VAR: &str = "COURIER_LOG_PAYLOADS";
/// Environment variable for the slow request threshold, in milliseconds
pub const SLOW_REQUEST_MS_VAR: &str = "COURIER_SLOW_REQUEST_MS";

/// Configuration error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed
    #[error("invalid value `{value}` for {var}: {reason}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// What was expected
        reason: &'static str,
    },

    /// Configuration validation failed
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// What to do when a second handler is registered for the same request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Keep the last registration and log a warning
    #[default]
    Replace,
    /// Fail `build()` with a duplicate-handler error
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" | "last-wins" => Ok(Self::Replace),
            "reject" | "error" => Ok(Self::Reject),
            _ => Err(ConfigError::InvalidValue {
                var: DUPLICATE_HANDLERS_VAR,
                value: s.to_string(),
                reason: "expected `replace` or `reject`",
            }),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Logging configuration used by the built-in logging behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Include the `Debug` form of requests and responses in log events
    pub log_payloads: bool,
    /// Requests slower than this log at `warn`
    pub slow_request_threshold: Duration,
}

impl LoggingConfig {
    /// Validate logging configuration
    ///
    /// # Errors
    ///
    /// Returns error if the slow request threshold is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slow_request_threshold.is_zero() {
            return Err(ConfigError::Validation(
                "slow_request_threshold must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_payloads: true,
            slow_request_threshold: Duration::from_millis(500),
        }
    }
}

/// Complete mediator configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediatorConfig {
    /// Duplicate handler registrations
    pub duplicate_handlers: DuplicatePolicy,
    /// Logging behavior settings
    pub logging: LoggingConfig,
}

impl MediatorConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unparseable value or the
    /// result fails validation
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unparseable value or the
    /// result fails validation
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(DUPLICATE_HANDLERS_VAR) {
            config.duplicate_handlers = value.parse()?;
        }

        if let Some(value) = lookup(LOG_PAYLOADS_VAR) {
            config.logging.log_payloads = parse_bool(LOG_PAYLOADS_VAR, &value)?;
        }

        if let Some(value) = lookup(SLOW_REQUEST_MS_VAR) {
            let millis = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    var: SLOW_REQUEST_MS_VAR,
                    value: value.clone(),
                    reason: "expected a whole number of milliseconds",
                })?;
            config.logging.slow_request_threshold = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate entire configuration
    ///
    /// # Errors
    ///
    /// Returns error if any section is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()
    }

    /// Set the duplicate handler policy
    #[must_use]
    pub const fn with_duplicate_handlers(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_handlers = policy;
        self
    }

    /// Set the logging configuration
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: "expected a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = MediatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MediatorConfig::default());
        assert_eq!(config.duplicate_handlers, DuplicatePolicy::Replace);
        assert!(config.logging.log_payloads);
        assert_eq!(config.logging.slow_request_threshold, Duration::from_millis(500));
    }

    #[test]
    fn reads_every_variable() {
        let config = MediatorConfig::from_lookup(lookup(&[
            (DUPLICATE_HANDLERS_VAR, "Reject"),
            (LOG_PAYLOADS_VAR, "off"),
            (SLOW_REQUEST_MS_VAR, "1200"),
        ]))
        .unwrap();

        assert_eq!(config.duplicate_handlers, DuplicatePolicy::Reject);
        assert!(!config.logging.log_payloads);
        assert_eq!(config.logging.slow_request_threshold, Duration::from_millis(1200));
    }

    #[test]
    fn rejects_unparseable_values() {
        let err = MediatorConfig::from_lookup(lookup(&[(DUPLICATE_HANDLERS_VAR, "sometimes")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == DUPLICATE_HANDLERS_VAR));

        let err = MediatorConfig::from_lookup(lookup(&[(SLOW_REQUEST_MS_VAR, "fast")])).unwrap_err();
        assert!(err.to_string().contains(SLOW_REQUEST_MS_VAR));
    }

    #[test]
    fn zero_threshold_fails_validation() {
        let err = MediatorConfig::from_lookup(lookup(&[(SLOW_REQUEST_MS_VAR, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn serde_uses_lowercase_policy_names() {
        let json = serde_json::to_value(MediatorConfig::default()).unwrap();
        assert_eq!(json["duplicate_handlers"], "replace");
    }
}
