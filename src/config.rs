//! Engine configuration.
//!
//! Configuration is loaded once at startup, validated, and then shared
//! read-only. Every setting has a default, so an empty environment yields
//! [`EngineConfig::default`].
//!
//! # Environment Variables
//!
//! | Variable | Default |
//! |---|---|
//! | `EFFECTUM_SERVICE_NAME` | `effectum` |
//! | `EFFECTUM_LOG_FILTER` | `info` |
//! | `EFFECTUM_LOG_FORMAT` | `pretty` (`pretty` or `json`) |
//! | `EFFECTUM_AUDIT_FAILURE_POLICY` | `block` (`block` or `log`) |
//! | `EFFECTUM_METRICS_ENABLED` | `true` |
//! | `EFFECTUM_CACHE_TTL_SECONDS` | `300` |
//!
//! # Example
//!
//! ```rust,no_run
//! use effectum::config::EngineConfig;
//!
//! let config = EngineConfig::from_env()?;
//! println!("service: {}", config.service_name);
//! # Ok::<(), effectum::config::ConfigError>(())
//! ```

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::audit::AuditFailurePolicy;

const SERVICE_NAME: &str = "EFFECTUM_SERVICE_NAME";
const LOG_FILTER: &str = "EFFECTUM_LOG_FILTER";
const LOG_FORMAT: &str = "EFFECTUM_LOG_FORMAT";
const AUDIT_FAILURE_POLICY: &str = "EFFECTUM_AUDIT_FAILURE_POLICY";
const METRICS_ENABLED: &str = "EFFECTUM_METRICS_ENABLED";
const CACHE_TTL_SECONDS: &str = "EFFECTUM_CACHE_TTL_SECONDS";

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// The name of the environment variable.
        key: String,
        /// Why the value is invalid.
        message: String,
    },
}

impl ConfigError {
    /// Creates an [`InvalidValue`](Self::InvalidValue) error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::invalid(
                LOG_FORMAT,
                format!("expected `pretty` or `json`, got `{other}`"),
            )),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Service label on audit entries and log records.
    pub service_name: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// What to do when an audit record cannot be written.
    pub audit_failure_policy: AuditFailurePolicy,
    /// Whether the composite interpreter counts effect outcomes.
    pub metrics_enabled: bool,
    /// How long the worked programs cache lookups.
    pub cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            service_name: "effectum".to_string(),
            log_filter: "info".to_string(),
            log_format: LogFormat::default(),
            audit_failure_policy: AuditFailurePolicy::default(),
            metrics_enabled: true,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the environment, after reading `.env` if
    /// one exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first variable that
    /// is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is not an error.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key/value source.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            service_name: lookup(SERVICE_NAME).unwrap_or(defaults.service_name),
            log_filter: lookup(LOG_FILTER).unwrap_or(defaults.log_filter),
            log_format: parsed(&lookup, LOG_FORMAT, defaults.log_format)?,
            audit_failure_policy: parsed(
                &lookup,
                AUDIT_FAILURE_POLICY,
                defaults.audit_failure_policy,
            )?,
            metrics_enabled: lookup(METRICS_ENABLED)
                .map(|value| parse_flag(METRICS_ENABLED, &value))
                .transpose()?
                .unwrap_or(defaults.metrics_enabled),
            cache_ttl: lookup(CACHE_TTL_SECONDS)
                .map(|value| {
                    value.trim().parse::<u64>().map_err(|error| {
                        ConfigError::invalid(CACHE_TTL_SECONDS, error.to_string())
                    })
                })
                .transpose()?
                .map_or(defaults.cache_ttl, Duration::from_secs),
        })
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service_name(self, service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..self
        }
    }

    /// Sets the log filter directive.
    #[must_use]
    pub fn with_log_filter(self, log_filter: impl Into<String>) -> Self {
        Self {
            log_filter: log_filter.into(),
            ..self
        }
    }

    /// Sets the log format.
    #[must_use]
    pub fn with_log_format(self, log_format: LogFormat) -> Self {
        Self { log_format, ..self }
    }

    /// Sets the audit failure policy.
    #[must_use]
    pub fn with_audit_failure_policy(self, audit_failure_policy: AuditFailurePolicy) -> Self {
        Self {
            audit_failure_policy,
            ..self
        }
    }

    /// Enables or disables effect metrics.
    #[must_use]
    pub fn with_metrics_enabled(self, metrics_enabled: bool) -> Self {
        Self {
            metrics_enabled,
            ..self
        }
    }

    /// Sets the lookup cache TTL.
    #[must_use]
    pub fn with_cache_ttl(self, cache_ttl: Duration) -> Self {
        Self { cache_ttl, ..self }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr<Err = ConfigError>,
{
    lookup(key).map_or(Ok(default), |value| value.parse())
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(
            key,
            format!("expected a boolean, got `{other}`"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[rstest]
    fn empty_environment_gives_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[rstest]
    fn every_variable_is_read() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            (SERVICE_NAME, "clinic"),
            (LOG_FILTER, "effectum=debug"),
            (LOG_FORMAT, "JSON"),
            (AUDIT_FAILURE_POLICY, "log"),
            (METRICS_ENABLED, "off"),
            (CACHE_TTL_SECONDS, "60"),
        ]))
        .unwrap();

        assert_eq!(
            config,
            EngineConfig::default()
                .with_service_name("clinic")
                .with_log_filter("effectum=debug")
                .with_log_format(LogFormat::Json)
                .with_audit_failure_policy(AuditFailurePolicy::LogAndContinue)
                .with_metrics_enabled(false)
                .with_cache_ttl(Duration::from_secs(60))
        );
    }

    #[rstest]
    #[case(LOG_FORMAT, "xml")]
    #[case(AUDIT_FAILURE_POLICY, "ignore")]
    #[case(METRICS_ENABLED, "maybe")]
    #[case(CACHE_TTL_SECONDS, "-5")]
    fn invalid_value_names_variable(#[case] key: &str, #[case] value: &str) {
        let error = EngineConfig::from_lookup(lookup_from(&[(key, value)])).unwrap_err();
        let ConfigError::InvalidValue { key: reported, .. } = error;
        assert_eq!(reported, key);
    }
}
