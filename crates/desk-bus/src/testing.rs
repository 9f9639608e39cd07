//! In-memory transport used by the unit tests of this crate.

use crate::handler::HandlerId;
use crate::transport::{MainTransport, WindowRegistry};
use desk_types::{Channel, Envelope, TransportError, WindowId};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Records every subscription and push.
///
/// Windows in `closing` still show up in [`WindowRegistry::windows`] but
/// reject sends, which models a window closing mid-broadcast.
#[derive(Default)]
pub struct RecordingTransport {
    subscriptions: Mutex<Vec<(Channel, HandlerId)>>,
    open: Mutex<Vec<WindowId>>,
    closing: Mutex<HashSet<WindowId>>,
    sent: Mutex<Vec<(WindowId, Channel, Envelope)>>,
}

impl RecordingTransport {
    pub fn with_windows(count: u32) -> Self {
        let transport = Self::default();
        *transport.open.lock() = (1..=count).map(WindowId::new).collect();
        transport
    }

    pub fn close_during_send(&self, window: WindowId) {
        self.closing.lock().insert(window);
    }

    pub fn is_subscribed(&self, channel: &Channel, handler: HandlerId) -> bool {
        self.subscriptions
            .lock()
            .iter()
            .any(|(c, h)| c == channel && *h == handler)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub fn sent(&self) -> Vec<(WindowId, Channel, Envelope)> {
        self.sent.lock().clone()
    }

    pub fn sent_on(&self, channel: &Channel) -> Vec<(WindowId, Envelope)> {
        self.sent
            .lock()
            .iter()
            .filter(|(_, c, _)| c == channel)
            .map(|(w, _, e)| (*w, e.clone()))
            .collect()
    }
}

impl MainTransport for RecordingTransport {
    fn on(&self, channel: &Channel, handler: HandlerId) {
        self.subscriptions.lock().push((channel.clone(), handler));
    }

    fn remove_handler(&self, channel: &Channel, handler: HandlerId) {
        self.subscriptions
            .lock()
            .retain(|(c, h)| !(c == channel && *h == handler));
    }

    fn send_to_window(
        &self,
        window: WindowId,
        channel: &Channel,
        envelope: &Envelope,
    ) -> Result<(), TransportError> {
        if self.closing.lock().contains(&window) {
            return Err(TransportError::WindowClosed(window));
        }
        self.sent
            .lock()
            .push((window, channel.clone(), envelope.clone()));
        Ok(())
    }
}

impl WindowRegistry for RecordingTransport {
    fn windows(&self) -> Vec<WindowId> {
        self.open.lock().clone()
    }
}
