//! Tracing subscriber installation.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{EngineConfig, LogFormat};

/// Failure to install the tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    /// The configured filter directive does not parse.
    #[error("invalid log filter `{directive}`: {message}")]
    InvalidFilter {
        /// The directive as configured.
        directive: String,
        /// Parser message.
        message: String,
    },

    /// A global subscriber was installed earlier.
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Installs the global subscriber described by `config`.
///
/// `RUST_LOG` takes precedence over [`EngineConfig::log_filter`].
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] on every call after the
/// first successful one, and [`TelemetryError::InvalidFilter`] when the
/// configured directive is malformed.
pub fn init_tracing(config: &EngineConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(|error| {
            TelemetryError::InvalidFilter {
                directive: config.log_filter.clone(),
                message: error.to_string(),
            }
        })?,
    };

    let (pretty, json) = match config.log_format {
        LogFormat::Pretty => (Some(fmt::layer().with_target(true)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_current_span(true))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()
        .map_err(|_| TelemetryError::AlreadyInitialized)?;

    tracing::info!(
        service = %config.service_name,
        format = %config.log_format,
        "tracing initialized"
    );
    Ok(())
}
