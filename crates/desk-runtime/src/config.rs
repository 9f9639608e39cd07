//! # Runtime Configuration
//!
//! All limits have defaults that can be overridden from the environment.

use desk_bus::BusConfig;
use desk_client::CorrelatorConfig;
use desk_telemetry::TelemetryConfig;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    /// Renderer windows opened at startup.
    pub windows: u32,
    /// Channels answered to the sender only, never broadcast.
    pub reply_only_channels: Vec<String>,
    /// How long a renderer request may stay unanswered. `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// How often renderers sweep for expired requests.
    pub cleanup_interval: Duration,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            windows: 1,
            reply_only_channels: Vec::new(),
            request_timeout: None,
            cleanup_interval: Duration::from_secs(5),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl DeskConfig {
    /// Load configuration from the environment.
    ///
    /// - `DESK_WINDOWS`: windows opened at startup (default: 1)
    /// - `DESK_REPLY_ONLY_CHANNELS`: comma separated channel names
    /// - `DESK_REQUEST_TIMEOUT_SECS`: renderer request timeout (default: none)
    /// - `DESK_CLEANUP_INTERVAL_SECS`: expiry sweep interval (default: 5)
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| env::var(key).ok());
        config.telemetry = TelemetryConfig::from_env();
        config
    }

    /// Build the configuration from any key lookup.
    ///
    /// Unparseable numbers fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            windows: lookup("DESK_WINDOWS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.windows),

            reply_only_channels: lookup("DESK_REPLY_ONLY_CHANNELS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.reply_only_channels),

            request_timeout: lookup("DESK_REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .or(defaults.request_timeout),

            cleanup_interval: lookup("DESK_CLEANUP_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),

            telemetry: defaults.telemetry,
        }
    }

    /// Check the configuration before the runtime starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ZeroCleanupInterval);
        }
        if self.request_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        if let Some(name) = self.reply_only_channels.iter().find(|name| name.ends_with("-reply")) {
            return Err(ConfigError::ReplyChannel(name.clone()));
        }
        Ok(())
    }

    /// Bus configuration derived from this runtime configuration.
    pub fn bus_config(&self) -> BusConfig {
        self.reply_only_channels
            .iter()
            .fold(BusConfig::default(), |config, name| config.reply_only(name.as_str()))
    }

    pub fn correlator_config(&self) -> CorrelatorConfig {
        CorrelatorConfig {
            request_timeout: self.request_timeout,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cleanup interval must be greater than zero")]
    ZeroCleanupInterval,

    #[error("request timeout must be greater than zero when set")]
    ZeroRequestTimeout,

    #[error("reply channel '{0}' cannot be configured as a request channel")]
    ReplyChannel(String),
}
