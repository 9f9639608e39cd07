//! # Channel Client
//!
//! Feature modules in a renderer talk to one main-process controller
//! through a `ChannelClient`. The client owns the correlator for its
//! channel and listens once on `<channel>-reply` to route answers back.

use crate::correlator::{Correlator, CorrelatorConfig};
use crate::listeners::{ListenerHandle, RendererEvents};
use crate::transport::RendererTransport;
use desk_types::{Channel, Envelope, RequestId, Scope, TransportError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

pub struct ChannelClient {
    channel: Channel,
    scope: Scope,
    transport: Arc<dyn RendererTransport>,
    events: Arc<RendererEvents>,
    correlator: Arc<Correlator>,
    reply_listener: ListenerHandle,
}

impl ChannelClient {
    pub fn new(
        channel: impl Into<Channel>,
        scope: impl Into<Scope>,
        transport: Arc<dyn RendererTransport>,
        events: Arc<RendererEvents>,
        config: CorrelatorConfig,
    ) -> Self {
        let channel = channel.into();
        let scope = scope.into();
        let correlator = Arc::new(Correlator::new(config));

        let reply_channel = channel.reply();
        let replies = correlator.clone();
        let reply_listener = events.listen(reply_channel.clone(), scope.clone(), move |envelope| {
            replies.on_reply(&reply_channel, envelope.clone());
        });

        info!(
            "[ChannelClient] {} bound to {} on {}",
            scope,
            channel,
            transport.window()
        );

        Self {
            channel,
            scope,
            transport,
            events,
            correlator,
            reply_listener,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    /// Send a request; `callback` runs once with the reply.
    ///
    /// When the send itself fails the pending entry is dropped and the
    /// callback never runs.
    pub fn request<F>(
        &self,
        scope: impl Into<Scope>,
        args: Value,
        callback: F,
    ) -> Result<RequestId, TransportError>
    where
        F: FnOnce(Envelope) + Send + 'static,
    {
        let envelope = self
            .correlator
            .create_request(self.channel.clone(), args, scope, callback);
        let id = envelope.id.clone();

        if let Err(err) = self.transport.send(&self.channel, envelope) {
            self.correlator.cancel(&id);
            return Err(err);
        }
        debug!(request_id = %id, "[ChannelClient] request sent on {}", self.channel);
        Ok(id)
    }

    /// Send a request and wait for the reply.
    ///
    /// Resolves to [`TransportError::Disconnected`] when the request is
    /// torn down before an answer arrives.
    pub async fn call(&self, args: Value) -> Result<Envelope, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.request(self.scope.clone(), args, move |envelope| {
            let _ = tx.send(envelope);
        })?;
        rx.await.map_err(|_| TransportError::Disconnected)
    }

    /// Ask main and block until it answers.
    ///
    /// This freezes the calling renderer for the whole round trip; keep it
    /// to small reads of state main already holds.
    pub fn request_sync(&self, args: Value) -> Result<Envelope, TransportError> {
        let envelope = Envelope::request(self.channel.clone(), args);
        self.transport.send_sync(&self.channel, envelope)
    }

    /// Publish without waiting for an answer.
    pub fn notify(&self, args: Value) -> Result<RequestId, TransportError> {
        let envelope = Envelope::request(self.channel.clone(), args);
        let id = envelope.id.clone();
        self.transport.send(&self.channel, envelope)?;
        Ok(id)
    }

    /// Drop every pending request of `scope`.
    pub fn cancel_scope(&self, scope: &Scope) -> usize {
        self.correlator.cancel_scope(scope)
    }

    /// Drop every pending request and stop listening for replies.
    pub fn teardown(&self) -> usize {
        self.events.unlisten(&self.reply_listener);
        let cancelled = self.correlator.cancel_all();
        info!("[ChannelClient] {} torn down, {} pending dropped", self.scope, cancelled);
        cancelled
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        self.events.unlisten(&self.reply_listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_types::{BusError, WindowId};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::time::Duration;

    /// Loopback transport: remembers sends and answers sync requests.
    #[derive(Default)]
    struct Loopback {
        sent: Mutex<Vec<Envelope>>,
        fail: Mutex<bool>,
    }

    impl RendererTransport for Loopback {
        fn window(&self) -> WindowId {
            WindowId::new(1)
        }

        fn send_sync(&self, channel: &Channel, envelope: Envelope) -> Result<Envelope, TransportError> {
            if *self.fail.lock() {
                return Err(TransportError::Disconnected);
            }
            Ok(envelope.with_data(json!({"echo": channel.as_str()})))
        }

        fn send(&self, _channel: &Channel, envelope: Envelope) -> Result<(), TransportError> {
            if *self.fail.lock() {
                return Err(TransportError::Disconnected);
            }
            self.sent.lock().push(envelope);
            Ok(())
        }
    }

    fn client() -> (Arc<Loopback>, Arc<RendererEvents>, ChannelClient) {
        let transport = Arc::new(Loopback::default());
        let events = Arc::new(RendererEvents::new());
        let client = ChannelClient::new(
            "circuit-client",
            "CircuitClient",
            transport.clone(),
            events.clone(),
            CorrelatorConfig::default(),
        );
        (transport, events, client)
    }

    #[test]
    fn test_reply_push_reaches_callback() {
        let (transport, events, client) = client();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let id = client
            .request("Sidebar", json!({"action": "load-active-circuit"}), move |env| {
                sink.lock().push(env)
            })
            .expect("sent");

        let sent = transport.sent.lock()[0].clone();
        let reply = sent.with_data(json!({"circuitName": "angry_dolphin"}));
        events.deliver(&client.channel().reply(), &reply);
        events.deliver(&client.channel().reply(), &reply);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, id);
        assert_eq!(client.correlator().stats().discarded, 1);
    }

    #[test]
    fn test_failed_send_drops_pending_entry() {
        let (transport, _, client) = client();
        *transport.fail.lock() = true;

        let result = client.request("Sidebar", json!({}), |_| panic!("never answered"));

        assert_eq!(result, Err(TransportError::Disconnected));
        assert_eq!(client.correlator().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_call_resolves_with_reply() {
        let (transport, events, client) = client();
        let client = Arc::new(client);

        let caller = client.clone();
        let pending = tokio::spawn(async move { caller.call(json!({"action": "start-wtf"})).await });

        let request = loop {
            if let Some(envelope) = transport.sent.lock().first().cloned() {
                break envelope;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        };
        events.deliver(&client.channel().reply(), &request.clone().with_data(json!("started")));

        let reply = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("answered in time")
            .expect("task joined")
            .expect("reply");
        assert_eq!(reply.id, request.id);
        assert_eq!(reply.data, Some(json!("started")));
    }

    #[tokio::test]
    async fn test_call_after_teardown_is_disconnected() {
        let (transport, _, client) = client();
        let client = Arc::new(client);

        let caller = client.clone();
        let pending = tokio::spawn(async move { caller.call(json!({})).await });
        while transport.sent.lock().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(client.teardown(), 1);

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .expect("resolved")
            .expect("task joined");
        assert_eq!(result, Err(TransportError::Disconnected));
    }

    #[test]
    fn test_request_sync_returns_answer() {
        let (_, _, client) = client();

        let answer = client.request_sync(json!({"action": "get-me"})).expect("answered");

        assert_eq!(answer.data, Some(json!({"echo": "ipc-circuit-client"})));
        assert_eq!(client.correlator().pending_count(), 0);
    }

    #[test]
    fn test_notify_leaves_nothing_pending() {
        let (transport, _, client) = client();

        client.notify(json!({"status": "online"})).expect("sent");

        assert_eq!(transport.sent.lock().len(), 1);
        assert_eq!(client.correlator().pending_count(), 0);
    }

    #[test]
    fn test_drop_unlistens_reply_channel() {
        let (_, events, client) = client();
        let reply = client.channel().reply();
        assert_eq!(events.listener_count(&reply), 1);

        drop(client);
        assert_eq!(events.listener_count(&reply), 0);
    }

    #[test]
    fn test_error_reply_reaches_callback() {
        let (transport, events, client) = client();
        let seen = Arc::new(Mutex::new(None));

        let sink = seen.clone();
        client
            .request("Sidebar", json!({}), move |env| *sink.lock() = Some(env))
            .expect("sent");
        let sent = transport.sent.lock()[0].clone();
        let failed = sent.with_error(BusError::unknown_channel(client.channel()));
        events.deliver(&client.channel().reply(), &failed);

        let seen = seen.lock();
        let envelope = seen.as_ref().expect("callback ran");
        assert!(envelope.outcome().is_err());
    }
}
