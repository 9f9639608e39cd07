//! # Desk Client
//!
//! Renderer side of the desktop IPC bus.
//!
//! - [`Correlator`]: pending request table keyed by request id
//! - [`RendererEvents`]: listener table fed by pushes from main
//! - [`ChannelClient`]: per-channel request/notify API used by feature code
//!
//! The host IPC primitive sits behind [`RendererTransport`].

pub mod client;
pub mod correlator;
pub mod listeners;
pub mod transport;

pub use client::ChannelClient;
pub use correlator::{
    cleanup_task, Correlator, CorrelatorConfig, CorrelatorStats, CorrelatorStatsSnapshot,
    ReplyCallback,
};
pub use listeners::{ListenerFn, ListenerHandle, RendererEvents};
pub use transport::RendererTransport;
