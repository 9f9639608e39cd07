//! Renderer window handle.

use crate::ipc::WindowPort;
use desk_client::{cleanup_task, ChannelClient, CorrelatorConfig, RendererEvents, RendererTransport};
use desk_types::{Channel, Scope, WindowId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// One open renderer window: its port to main, its listener table, and the
/// clients feature code creates on it.
pub struct Renderer {
    window: WindowId,
    port: Arc<WindowPort>,
    events: Arc<RendererEvents>,
    correlator_config: CorrelatorConfig,
    cleanup_interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
    cleanup_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Renderer {
    pub(crate) fn new(
        port: Arc<WindowPort>,
        events: Arc<RendererEvents>,
        correlator_config: CorrelatorConfig,
        cleanup_interval: Duration,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            window: port.window(),
            port,
            events,
            correlator_config,
            cleanup_interval,
            shutdown_rx,
            cleanup_tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Listener table fed by this window's pump.
    pub fn events(&self) -> &Arc<RendererEvents> {
        &self.events
    }

    pub fn transport(&self) -> Arc<dyn RendererTransport> {
        self.port.clone()
    }

    /// Create a client for `channel` in this window.
    ///
    /// With a request timeout configured, a sweep task expires its stale
    /// requests until shutdown or until this handle is dropped. Must be
    /// called from within the tokio runtime.
    pub fn client(&self, channel: impl Into<Channel>, scope: impl Into<Scope>) -> Arc<ChannelClient> {
        let client = Arc::new(ChannelClient::new(
            channel,
            scope,
            self.transport(),
            self.events.clone(),
            self.correlator_config,
        ));

        if self.correlator_config.request_timeout.is_some() {
            let correlator = client.correlator().clone();
            let interval = self.cleanup_interval;
            let mut shutdown = self.shutdown_rx.clone();
            let channel = client.channel().clone();

            let handle = tokio::spawn(async move {
                tokio::select! {
                    _ = cleanup_task(correlator, interval) => {}
                    _ = shutdown.changed() => {
                        debug!("[Renderer] expiry sweep for {} stopped", channel);
                    }
                }
            });
            self.cleanup_tasks.lock().push(handle);
        }

        client
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        for task in self.cleanup_tasks.lock().drain(..) {
            task.abort();
        }
    }
}
