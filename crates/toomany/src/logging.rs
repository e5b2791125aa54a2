//! Structured logging with tracing
//!
//! Logs go to stderr, human-readable by default or JSON lines on request.
//! A `TOOMANY_LOG` filter directive takes precedence over the configured
//! level.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Environment variable holding a full filter directive
pub const LOG_ENV: &str = "TOOMANY_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("logging already initialised: {0}")]
    Init(#[from] TryInitError),
}

/// Build the filter from a directive, falling back to the configured level
///
/// A blank directive counts as unset.
pub fn build_filter(
    config: &LoggingConfig,
    directive: Option<&str>,
) -> Result<EnvFilter, LoggingError> {
    match directive {
        Some(directive) if !directive.trim().is_empty() => Ok(EnvFilter::try_new(directive)?),
        _ => Ok(EnvFilter::try_new(&config.level)?),
    }
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let directive = std::env::var(LOG_ENV).ok();
    let filter = build_filter(config, directive.as_deref())?;
    let registry = Registry::default().with(filter);

    // The layer types differ, so each branch initialises on its own
    if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()?;
    }

    tracing::debug!(level = %config.level, json = config.json_format, "logging initialised");
    Ok(())
}
