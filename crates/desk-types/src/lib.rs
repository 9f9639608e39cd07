//! # Desk Types Crate
//!
//! Types shared by the main process and every renderer window:
//!
//! - [`Envelope`]: the request/response value that travels the bus
//! - [`Channel`]: prefixed channel names and their `-reply` siblings
//! - [`RequestId`], [`Scope`], [`WindowId`]: identifiers
//! - [`BusError`] / [`ErrorKind`]: the error taxonomy carried in envelopes
//! - [`catalog`]: the application's channel names
//!
//! Nothing here performs I/O; the crate defines what crosses the process
//! boundary and nothing else.

pub mod catalog;
pub mod channel;
pub mod envelope;
pub mod errors;
pub mod ids;

pub use channel::{Channel, CHANNEL_PREFIX, REPLY_SUFFIX};
pub use envelope::Envelope;
pub use errors::{BusError, ErrorKind, TransportError};
pub use ids::{RequestId, Scope, WindowId};
