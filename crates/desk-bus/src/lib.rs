//! # Desk Bus
//!
//! Main-process side of the desktop IPC bus: the channel registry, the
//! dispatcher that runs handlers and fans envelopes out to windows, and the
//! controller action router.
//!
//! ## Architecture
//!
//! ```text
//! renderer ──request──→ MainBus::receive ──→ ChannelRegistry (snapshot)
//!                             │                   │
//!                             │             handle_one × N
//!                             ↓                   │
//!                 <channel>-reply (deferred) ←────┘
//!                             ↓
//!                 broadcast on <channel> to every window (FanOut::AllWindows)
//! ```
//!
//! The transport is abstracted behind [`MainTransport`] and
//! [`WindowRegistry`] so the bus can be driven in-process by tests or by
//! the local runtime.

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod stats;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{BusConfig, FanOut};
pub use controller::{ControllerError, ControllerRouter, ACTION_KEY};
pub use dispatcher::{DispatchReport, HandlerContext, HandlerResult, MainBus};
pub use handler::{
    handler_fn, Delivery, Handler, HandlerFn, HandlerId, HandlerState, Outcome, RegisteredHandler,
    Registration, ReturnValues,
};
pub use registry::ChannelRegistry;
pub use stats::{BusStats, BusStatsSnapshot};
pub use transport::{MainTransport, WindowRegistry};
