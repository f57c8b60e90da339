//! Log output for the CLI and the backend.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

/// Failure to install the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init(default_filter: &str) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|source| TelemetryError::EnvFilter {
            value: default_filter.to_string(),
            source,
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
