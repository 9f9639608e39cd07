//! # Error Types
//!
//! The bus error taxonomy. A [`BusError`] is a value: it is stored in a
//! handler's return values and in the envelope's `error` field, and it
//! crosses the process boundary as data. It is never unwound through the
//! dispatcher.

use crate::channel::Channel;
use crate::ids::WindowId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Category of a bus failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A channel's primary callback failed.
    #[serde(rename = "CallbackError")]
    Callback,
    /// A channel's reply function failed after the callback succeeded.
    #[serde(rename = "ReplyError")]
    Reply,
    /// A request arrived for a channel with no registered handler.
    #[serde(rename = "UnknownChannelError")]
    UnknownChannel,
    /// A pending request outlived the correlator's request timeout.
    #[serde(rename = "ExpiredError")]
    Expired,
    /// The transport could not carry the request.
    #[serde(rename = "TransportError")]
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Callback => "CallbackError",
            ErrorKind::Reply => "ReplyError",
            ErrorKind::UnknownChannel => "UnknownChannelError",
            ErrorKind::Expired => "ExpiredError",
            ErrorKind::Transport => "TransportError",
        };
        f.write_str(name)
    }
}

/// A failure captured by the bus, tagged with its originating channel.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("[ {kind} :: {channel} -> {message} @ {timestamp} ]")]
pub struct BusError {
    pub kind: ErrorKind,
    pub message: String,
    pub channel: Channel,
    pub timestamp: DateTime<Utc>,
    /// Full error chain of the underlying failure, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl BusError {
    pub fn new(kind: ErrorKind, channel: &Channel, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            channel: channel.clone(),
            timestamp: Utc::now(),
            trace: None,
        }
    }

    /// Wrap a failed handler callback.
    pub fn callback(channel: &Channel, source: &anyhow::Error) -> Self {
        Self::new(ErrorKind::Callback, channel, format!("{source:#}"))
            .with_trace(format!("{source:?}"))
    }

    /// Wrap a failed reply function.
    pub fn reply(channel: &Channel, source: &anyhow::Error) -> Self {
        Self::new(ErrorKind::Reply, channel, format!("{source:#}"))
            .with_trace(format!("{source:?}"))
    }

    pub fn unknown_channel(channel: &Channel) -> Self {
        Self::new(
            ErrorKind::UnknownChannel,
            channel,
            format!("no handlers registered for {channel}"),
        )
    }

    pub fn expired(channel: &Channel, waited: Duration) -> Self {
        Self::new(
            ErrorKind::Expired,
            channel,
            format!("no reply after {}ms", waited.as_millis()),
        )
    }

    pub fn transport(channel: &Channel, source: &TransportError) -> Self {
        Self::new(ErrorKind::Transport, channel, source.to_string())
    }

    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

/// Errors raised by a transport implementation.
///
/// These stay inside the process that observed them; when a caller needs to
/// see one it is converted into a [`BusError`] of kind
/// [`ErrorKind::Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The target window closed before the message was delivered.
    #[error("{0} is closed")]
    WindowClosed(WindowId),

    /// The other side of the transport has shut down.
    #[error("transport disconnected")]
    Disconnected,

    /// The envelope could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}
