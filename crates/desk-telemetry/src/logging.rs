//! Subscriber setup.
//!
//! One `tracing-subscriber` registry per process: an `EnvFilter` built from
//! the configured level, plus a pretty or JSON `fmt` layer when console
//! output is enabled.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter for `config`.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Filter(format!("{}: {}", config.log_level, e)))
}

/// Install the global subscriber.
pub(crate) fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;

    let result = match (config.console_output, config.json_logs) {
        (true, true) => {
            // JSON output for log shippers
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
        }
        (true, false) => {
            // Pretty output for development
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
        (false, _) => tracing_subscriber::registry().with(filter).try_init(),
    };

    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))
}
