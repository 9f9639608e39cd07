//! Bus configuration.
//!
//! Broadcast scope is a property of the channel, set here, and is
//! independent of when a handler's reply is delivered (see
//! [`Delivery`](crate::Delivery)).

use desk_types::Channel;
use std::collections::HashMap;

/// Who observes an envelope after a dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOut {
    /// Every live window receives the envelope on the request channel.
    #[default]
    AllWindows,
    /// Only the originator hears back (through its return value or reply
    /// channel); nothing is broadcast.
    OriginOnly,
}

#[derive(Debug, Clone, Default)]
pub struct BusConfig {
    /// Fan-out for channels without an override.
    pub default_fan_out: FanOut,
    /// Per-channel overrides.
    pub channels: HashMap<Channel, FanOut>,
}

impl BusConfig {
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<Channel>, fan_out: FanOut) -> Self {
        self.channels.insert(channel.into(), fan_out);
        self
    }

    /// Mark a channel as request/reply only (no broadcast).
    #[must_use]
    pub fn reply_only(self, channel: impl Into<Channel>) -> Self {
        self.with_channel(channel, FanOut::OriginOnly)
    }

    pub fn fan_out(&self, channel: &Channel) -> FanOut {
        self.channels
            .get(channel)
            .copied()
            .unwrap_or(self.default_fan_out)
    }
}
