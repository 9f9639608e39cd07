//! # Renderer Listener Table
//!
//! Callbacks and streams keyed by channel. The host's receive loop feeds
//! every push from main into [`RendererEvents::deliver`]; listeners on that
//! channel run in registration order.

use desk_types::{Channel, Envelope, Scope};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info};

/// Callback run for each envelope pushed on a channel.
pub type ListenerFn = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Identifies one listener so it can be removed again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerHandle {
    id: u64,
    channel: Channel,
    scope: Scope,
}

impl ListenerHandle {
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

struct Listener {
    handle: ListenerHandle,
    callback: ListenerFn,
}

#[derive(Default)]
pub struct RendererEvents {
    listeners: RwLock<Vec<Listener>>,
    streams: Mutex<Vec<(Channel, mpsc::UnboundedSender<Envelope>)>>,
    next_id: AtomicU64,
}

impl RendererEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen<F>(&self, channel: impl Into<Channel>, scope: impl Into<Scope>, callback: F) -> ListenerHandle
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let handle = ListenerHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            channel: channel.into(),
            scope: scope.into(),
        };
        info!("[RendererEvents] listen {} {}", handle.channel, handle.scope);

        self.listeners.write().push(Listener {
            handle: handle.clone(),
            callback: Arc::new(callback),
        });
        handle
    }

    /// Remove a listener. Returns `false` when it was already removed.
    pub fn unlisten(&self, handle: &ListenerHandle) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| l.handle.id != handle.id);
        let removed = listeners.len() != before;
        if removed {
            info!("[RendererEvents] unlisten {} {}", handle.channel, handle.scope);
        }
        removed
    }

    /// Stream of every envelope delivered on `channel` from now on.
    ///
    /// The stream ends when the table is dropped; dropping the stream
    /// unsubscribes it on the next delivery.
    pub fn subscribe(&self, channel: impl Into<Channel>) -> UnboundedReceiverStream<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.lock().push((channel.into(), tx));
        UnboundedReceiverStream::new(rx)
    }

    /// Hand an envelope pushed by main to every listener on `channel`.
    ///
    /// Returns how many listeners and streams received it.
    pub fn deliver(&self, channel: &Channel, envelope: &Envelope) -> usize {
        let callbacks: Vec<ListenerFn> = self
            .listeners
            .read()
            .iter()
            .filter(|l| &l.handle.channel == channel)
            .map(|l| l.callback.clone())
            .collect();

        for callback in &callbacks {
            callback(envelope);
        }

        let mut streamed = 0;
        self.streams.lock().retain(|(subscribed, tx)| {
            if subscribed != channel {
                return !tx.is_closed();
            }
            match tx.send(envelope.clone()) {
                Ok(()) => {
                    streamed += 1;
                    true
                }
                Err(_) => false,
            }
        });

        let delivered = callbacks.len() + streamed;
        if delivered == 0 {
            debug!("[RendererEvents] nothing listens on {}", channel);
        }
        delivered
    }

    pub fn listener_count(&self, channel: &Channel) -> usize {
        self.listeners
            .read()
            .iter()
            .filter(|l| &l.handle.channel == channel)
            .count()
    }
}
