//! # Channel Registry
//!
//! Authoritative set of handlers per channel. Multiple handlers may listen
//! on the same channel; they are kept in registration order and removed by
//! identity.
//!
//! Unregistering is one step under the write lock: the handler leaves the
//! list and turns inactive together, so a concurrent dispatch either sees an
//! active handler in the list or does not see it at all.

use crate::handler::{Handler, HandlerId, RegisteredHandler, Registration};
use crate::transport::MainTransport;
use desk_types::Channel;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ChannelRegistry {
    /// Registered handlers in registration order.
    handlers: RwLock<Vec<Handler>>,
    /// Next handler id.
    next_id: AtomicU64,
    /// Receive side of the transport.
    transport: Arc<dyn MainTransport>,
}

impl ChannelRegistry {
    pub fn new(transport: Arc<dyn MainTransport>) -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            transport,
        }
    }

    /// Register a handler and subscribe it on the transport.
    ///
    /// Duplicate registrations on a channel are allowed and fan out.
    pub fn register(&self, registration: Registration) -> Handler {
        let id = HandlerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler = Arc::new(RegisteredHandler::new(id, registration));

        self.transport.on(handler.channel(), id);
        self.handlers.write().push(handler.clone());

        info!(
            "[Registry] register handler {} : {} {}",
            id,
            handler.channel(),
            handler.scope()
        );
        handler
    }

    /// Remove a handler by identity.
    ///
    /// Returns the removed handler, or `None` when it was already gone;
    /// calling this twice is harmless.
    pub fn unregister(&self, handler: &Handler) -> Option<Handler> {
        let removed = {
            let mut handlers = self.handlers.write();
            let position = handlers.iter().position(|h| h.id() == handler.id());
            position.map(|index| {
                let removed = handlers.remove(index);
                removed.deactivate();
                removed
            })
        };

        match removed {
            Some(removed) => {
                self.transport.remove_handler(removed.channel(), removed.id());
                info!(
                    "[Registry] unregister handler {} : {}",
                    removed.id(),
                    removed.channel()
                );
                Some(removed)
            }
            None => {
                handler.deactivate();
                warn!(
                    "[Registry] handler {} on {} is not registered",
                    handler.id(),
                    handler.channel()
                );
                None
            }
        }
    }

    /// Unregister and strip a handler.
    ///
    /// Always returns `None`, so callers can overwrite their handle with the
    /// result.
    pub fn destroy(&self, handler: Handler) -> Option<Handler> {
        debug!("[Registry] destroy handler {} : {}", handler.id(), handler.channel());
        self.unregister(&handler);
        handler.strip();
        None
    }

    /// Active handlers for `channel`, in registration order.
    pub fn handlers_for(&self, channel: &Channel) -> Vec<Handler> {
        self.handlers
            .read()
            .iter()
            .filter(|h| h.channel() == channel && h.is_active())
            .cloned()
            .collect()
    }

    /// Number of registered handlers on `channel`.
    pub fn channel_count(&self, channel: &Channel) -> usize {
        self.handlers
            .read()
            .iter()
            .filter(|h| h.channel() == channel)
            .count()
    }

    /// Channels with at least one handler, in order of first registration.
    pub fn channels(&self) -> Vec<Channel> {
        let handlers = self.handlers.read();
        let mut channels: Vec<Channel> = Vec::new();
        for handler in handlers.iter() {
            if !channels.contains(handler.channel()) {
                channels.push(handler.channel().clone());
            }
        }
        channels
    }

    pub fn contains(&self, handler: &Handler) -> bool {
        self.handlers.read().iter().any(|h| h.id() == handler.id())
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Unregister every handler. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<Handler> = {
            let mut handlers = self.handlers.write();
            let drained: Vec<Handler> = handlers.drain(..).collect();
            for handler in &drained {
                handler.deactivate();
            }
            drained
        };
        for handler in &drained {
            self.transport.remove_handler(handler.channel(), handler.id());
        }
        info!("[Registry] cleared {} handlers", drained.len());
        drained.len()
    }
}
