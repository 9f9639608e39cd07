//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Which side of the bus a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessRole {
    #[default]
    Main,
    Renderer,
}

impl ProcessRole {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "main" => Some(Self::Main),
            "renderer" => Some(Self::Renderer),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Renderer => f.write_str("renderer"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Process role (main or renderer)
    pub process_role: ProcessRole,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to write logs to the console
    pub console_output: bool,

    /// Whether to format logs as JSON
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "circuit-desk".to_string(),
            process_role: ProcessRole::Main,
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DESK_SERVICE_NAME`: Service name (default: circuit-desk)
    /// - `DESK_PROCESS_ROLE`: `main` or `renderer` (default: main)
    /// - `DESK_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `DESK_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `DESK_JSON_LOGS`: Enable JSON logs (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            service_name: lookup("DESK_SERVICE_NAME").unwrap_or(defaults.service_name),

            process_role: lookup("DESK_PROCESS_ROLE")
                .and_then(|v| ProcessRole::parse(&v))
                .unwrap_or(defaults.process_role),

            log_level: lookup("DESK_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: lookup("DESK_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.console_output),

            json_logs: lookup("DESK_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.json_logs),
        }
    }

    /// Derived configuration for one renderer window.
    #[must_use]
    pub fn for_renderer(&self, window: u32) -> Self {
        Self {
            service_name: format!("{}-window-{}", self.service_name, window),
            process_role: ProcessRole::Renderer,
            ..self.clone()
        }
    }
}
