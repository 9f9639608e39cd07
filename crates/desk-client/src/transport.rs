//! # Transport Boundary (renderer side)
//!
//! What a renderer window needs from the host IPC primitive. Pushes from
//! main arrive through [`RendererEvents::deliver`](crate::RendererEvents::deliver),
//! which the host calls from its receive loop.

use desk_types::{Channel, Envelope, TransportError, WindowId};

pub trait RendererTransport: Send + Sync {
    /// Window this transport belongs to.
    fn window(&self) -> WindowId;

    /// Send a request and wait for main to answer it.
    ///
    /// Blocks the calling thread until the main process has run every
    /// handler for `channel`. Only suitable for small, fast reads of local
    /// state; anything that can take unbounded time must use [`send`].
    ///
    /// [`send`]: RendererTransport::send
    fn send_sync(&self, channel: &Channel, envelope: Envelope) -> Result<Envelope, TransportError>;

    /// Fire-and-forget send; any answer arrives later as a push.
    fn send(&self, channel: &Channel, envelope: Envelope) -> Result<(), TransportError>;
}
