//! # Event Envelope
//!
//! The unit of communication on the bus. An envelope is a plain value: the
//! renderer builds it, the transport carries it, main-process handlers fill
//! in `data` or `error`, and it travels back.
//!
//! Wire shape:
//!
//! ```text
//! { "type": string, "id": string, "args": any, "data": any|null,
//!   "error": {kind, message, channel, timestamp}|null }
//! ```
//!
//! Consumers must check `error` before `data`; both may be set when one
//! handler succeeded and a sibling failed.

use crate::channel::Channel;
use crate::errors::{BusError, TransportError};
use crate::ids::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Channel the envelope travels on.
    #[serde(rename = "type")]
    pub channel: Channel,

    /// Correlation id, unique per outgoing request.
    pub id: RequestId,

    /// Request payload.
    #[serde(default)]
    pub args: Value,

    /// Response payload, filled in by the handler.
    #[serde(default)]
    pub data: Option<Value>,

    /// Captured failure, if any handler failed.
    #[serde(default)]
    pub error: Option<BusError>,
}

impl Envelope {
    pub fn new(channel: Channel, id: RequestId, args: Value) -> Self {
        Self {
            channel,
            id,
            args,
            data: None,
            error: None,
        }
    }

    /// Build a request with a freshly generated correlation id.
    pub fn request(channel: Channel, args: Value) -> Self {
        Self::new(channel, RequestId::generate(), args)
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: BusError) -> Self {
        self.error = Some(error);
        self
    }

    /// Record an error unless one is already present; the first failure of
    /// a dispatch pass wins.
    pub fn capture_error(&mut self, error: BusError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Outcome with the error checked first.
    pub fn outcome(&self) -> Result<Option<&Value>, &BusError> {
        match &self.error {
            Some(err) => Err(err),
            None => Ok(self.data.as_ref()),
        }
    }

    /// Deserialize `data` into a typed value.
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Result<Option<T>, TransportError> {
        match &self.data {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, TransportError> {
        Ok(serde_json::from_str(raw)?)
    }
}
