//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over [`LoggingConfig::level`] when set.

use crate::config::{LogFormat, LoggingConfig};
use crate::utils::truncate;
use crate::{Error, ErrorContext, Result};
use tracing_subscriber::EnvFilter;

/// Longest error string written to a single log line.
pub const MAX_LOGGED_ERROR_CHARS: usize = 200;

/// Install the global fmt subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid log level '{}'", config.level),
                ErrorContext::new()
                    .with_field_path("logging.level")
                    .with_details(e.to_string()),
            )
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };

    installed.map_err(|e| {
        Error::runtime_with_context(
            "failed to install tracing subscriber",
            ErrorContext::new()
                .with_details(e.to_string())
                .with_source("logging"),
        )
    })
}

/// Bound an error message for logging.
pub fn truncate_error(message: &str) -> String {
    truncate(message, MAX_LOGGED_ERROR_CHARS)
}
