//! # Local IPC
//!
//! In-process stand-in for the host's IPC primitive. Every envelope crosses
//! it as JSON text, the same shape it would have on a real process
//! boundary.
//!
//! - renderer → main, async: one inbound queue drained by the main loop in
//!   arrival order
//! - renderer → main, sync: straight into [`MainBus::receive`] on the
//!   caller's thread; the bus's dispatch lock keeps it from overlapping a
//!   pass of the main loop
//! - main → renderer: one push queue per window, drained by that window's
//!   pump task

use desk_bus::{HandlerId, MainBus, MainTransport, WindowRegistry};
use desk_client::RendererTransport;
use desk_types::{Channel, Envelope, RequestId, TransportError, WindowId};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// One message on the wire.
#[derive(Debug, Clone)]
pub struct WireMessage {
    pub channel: Channel,
    pub payload: String,
}

impl WireMessage {
    pub fn encode(channel: &Channel, envelope: &Envelope) -> Result<Self, TransportError> {
        Ok(Self {
            channel: channel.clone(),
            payload: envelope.to_json()?,
        })
    }

    pub fn decode(&self) -> Result<Envelope, TransportError> {
        Envelope::from_json(&self.payload)
    }

    /// The `id` field of the payload, readable even when the rest of the
    /// envelope is malformed.
    pub fn request_id(&self) -> Option<RequestId> {
        let raw: serde_json::Value = serde_json::from_str(&self.payload).ok()?;
        raw.get("id")?.as_str().map(RequestId::from)
    }
}

/// A renderer → main async send.
#[derive(Debug)]
pub struct Inbound {
    pub origin: WindowId,
    pub message: WireMessage,
}

/// Main-side end of the local transport.
pub struct LocalIpc {
    windows: RwLock<BTreeMap<WindowId, mpsc::UnboundedSender<WireMessage>>>,
    subscriptions: Mutex<HashMap<Channel, Vec<HandlerId>>>,
    inbound: mpsc::UnboundedSender<Inbound>,
}

impl LocalIpc {
    /// Create the transport and the receiver the main loop drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Inbound>) {
        let (inbound, inbound_rx) = mpsc::unbounded_channel();
        let ipc = Self {
            windows: RwLock::new(BTreeMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            inbound,
        };
        (ipc, inbound_rx)
    }

    /// Register a window and return its push queue.
    pub fn open_window(&self, window: WindowId) -> mpsc::UnboundedReceiver<WireMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.windows.write().insert(window, tx);
        info!("[LocalIpc] opened {}", window);
        rx
    }

    /// Forget a window. Its push queue ends once drained.
    pub fn close_window(&self, window: WindowId) -> bool {
        let closed = self.windows.write().remove(&window).is_some();
        if closed {
            info!("[LocalIpc] closed {}", window);
        }
        closed
    }

    pub fn is_open(&self, window: WindowId) -> bool {
        self.windows.read().contains_key(&window)
    }

    /// Handlers subscribed on `channel`.
    pub fn subscription_count(&self, channel: &Channel) -> usize {
        self.subscriptions
            .lock()
            .get(channel)
            .map_or(0, Vec::len)
    }

    pub(crate) fn submit(&self, origin: WindowId, message: WireMessage) -> Result<(), TransportError> {
        self.inbound
            .send(Inbound { origin, message })
            .map_err(|_| TransportError::Disconnected)
    }
}

impl MainTransport for LocalIpc {
    fn on(&self, channel: &Channel, handler: HandlerId) {
        let mut subscriptions = self.subscriptions.lock();
        let handlers = subscriptions.entry(channel.clone()).or_default();
        handlers.push(handler);
        debug!("[LocalIpc] {} subscribed to {} ({} total)", handler, channel, handlers.len());
    }

    fn remove_handler(&self, channel: &Channel, handler: HandlerId) {
        let mut subscriptions = self.subscriptions.lock();
        if let Some(handlers) = subscriptions.get_mut(channel) {
            handlers.retain(|h| *h != handler);
            if handlers.is_empty() {
                subscriptions.remove(channel);
            }
        }
        debug!("[LocalIpc] {} unsubscribed from {}", handler, channel);
    }

    fn send_to_window(
        &self,
        window: WindowId,
        channel: &Channel,
        envelope: &Envelope,
    ) -> Result<(), TransportError> {
        let message = WireMessage::encode(channel, envelope)?;
        let windows = self.windows.read();
        let tx = windows.get(&window).ok_or(TransportError::WindowClosed(window))?;
        tx.send(message).map_err(|_| TransportError::WindowClosed(window))
    }
}

impl WindowRegistry for LocalIpc {
    fn windows(&self) -> Vec<WindowId> {
        self.windows.read().keys().copied().collect()
    }
}

/// Renderer-side end of the local transport for one window.
pub struct WindowPort {
    window: WindowId,
    ipc: Arc<LocalIpc>,
    bus: Arc<MainBus>,
}

impl WindowPort {
    pub fn new(window: WindowId, ipc: Arc<LocalIpc>, bus: Arc<MainBus>) -> Self {
        Self { window, ipc, bus }
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.ipc.is_open(self.window) {
            Ok(())
        } else {
            Err(TransportError::WindowClosed(self.window))
        }
    }
}

impl RendererTransport for WindowPort {
    fn window(&self) -> WindowId {
        self.window
    }

    fn send_sync(&self, channel: &Channel, envelope: Envelope) -> Result<Envelope, TransportError> {
        self.ensure_open()?;
        let request = WireMessage::encode(channel, &envelope)?.decode()?;
        let answer = self.bus.receive(self.window, channel, request);
        WireMessage::encode(channel, &answer)?.decode()
    }

    fn send(&self, channel: &Channel, envelope: Envelope) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.ipc.submit(self.window, WireMessage::encode(channel, &envelope)?)
    }
}
