//! # Desk Telemetry
//!
//! Logging for the Circuit Desk processes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use desk_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::from_env())?;
//!     // bus activity is now logged
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DESK_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `DESK_JSON_LOGS` | `false` | JSON formatted logs |
//! | `DESK_CONSOLE_OUTPUT` | `true` | Write logs to the console |
//! | `DESK_SERVICE_NAME` | `circuit-desk` | Service name |
//! | `DESK_PROCESS_ROLE` | `main` | `main` or `renderer` |

mod config;
mod logging;

pub use config::{ProcessRole, TelemetryConfig};
pub use logging::env_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber described by `config`.
///
/// Returns a guard to hold for the lifetime of the process. Fails when a
/// subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    logging::init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        role = %config.process_role,
        json = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { config })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    config: TelemetryConfig,
}

impl TelemetryGuard {
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.config.service_name, "Shutting down telemetry...");
    }
}

/// Span scoped to one bus channel.
///
/// # Example
///
/// ```rust,ignore
/// use desk_telemetry::bus_span;
///
/// let _span = bus_span!("load_circuit", "ipc-circuit-client", request_id = %id).entered();
/// ```
#[macro_export]
macro_rules! bus_span {
    ($name:expr, $channel:expr) => {
        tracing::info_span!($name, channel = %$channel)
    };
    ($name:expr, $channel:expr, $($field:tt)*) => {
        tracing::info_span!($name, channel = %$channel, $($field)*)
    };
}
