//! # Transport Boundary (main side)
//!
//! The host runtime's IPC primitive, seen from the main process. The bus
//! only needs to subscribe handlers to a channel, unsubscribe them, and push
//! an envelope to one window. Window bookkeeping belongs to the window
//! manager and is read through [`WindowRegistry`].

use crate::handler::HandlerId;
use desk_types::{Channel, Envelope, TransportError, WindowId};

/// Receive and push side of the main-process transport.
pub trait MainTransport: Send + Sync {
    /// Route inbound messages on `channel` to the bus for `handler`.
    fn on(&self, channel: &Channel, handler: HandlerId);

    /// Stop routing `channel` for `handler`.
    fn remove_handler(&self, channel: &Channel, handler: HandlerId);

    /// Push an envelope to one window without expecting a reply.
    fn send_to_window(
        &self,
        window: WindowId,
        channel: &Channel,
        envelope: &Envelope,
    ) -> Result<(), TransportError>;
}

/// Live list of open UI windows.
pub trait WindowRegistry: Send + Sync {
    /// Snapshot of the windows open right now.
    ///
    /// A window in the snapshot may close before it is reached; senders must
    /// treat [`TransportError::WindowClosed`] as a normal outcome.
    fn windows(&self) -> Vec<WindowId>;
}
