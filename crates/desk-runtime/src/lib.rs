//! # Desk Runtime
//!
//! Hosts the main-process bus and its renderer windows in one process.
//!
//! ## Tasks
//!
//! - **main loop**: drains renderer async sends in arrival order and hands
//!   each one to [`MainBus::receive_async`], which answers the sender once
//!   on `<channel>-reply`
//! - **pump** (one per window): decodes pushes from main and delivers them
//!   to that window's [`RendererEvents`], inside a span carrying the
//!   window's telemetry identity
//! - **expiry sweep** (one per client, only with a request timeout)
//!
//! Every task watches the shared shutdown channel.

pub mod config;
pub mod controllers;
pub mod ipc;
pub mod renderer;

pub use config::{ConfigError, DeskConfig};
pub use controllers::Stores;
pub use ipc::{Inbound, LocalIpc, WindowPort, WireMessage};
pub use renderer::Renderer;

use desk_bus::{MainBus, MainTransport};
use desk_client::RendererEvents;
use desk_telemetry::bus_span;
use desk_types::{BusError, Envelope, WindowId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("runtime already started")]
    AlreadyStarted,
}

/// The in-process desk: main bus, local transport, open windows.
pub struct DeskRuntime {
    config: DeskConfig,
    ipc: Arc<LocalIpc>,
    bus: Arc<MainBus>,
    stores: Stores,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Inbound>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    next_window: AtomicU32,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DeskRuntime {
    /// Build the runtime and register the feature controllers.
    pub fn new(config: DeskConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        info!("Creating Circuit Desk runtime");

        let (ipc, inbound_rx) = LocalIpc::new();
        let ipc = Arc::new(ipc);
        let bus = Arc::new(MainBus::new(ipc.clone(), ipc.clone(), config.bus_config()));

        let stores = Stores::default();
        let handlers = controllers::register_all(&bus, &stores);
        info!("{} controllers registered", handlers.len());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            ipc,
            bus,
            stores,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            shutdown_tx,
            shutdown_rx,
            next_window: AtomicU32::new(1),
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<MainBus> {
        &self.bus
    }

    pub fn ipc(&self) -> &Arc<LocalIpc> {
        &self.ipc
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Spawn the main loop.
    pub fn start(&self) -> Result<(), RuntimeError> {
        let inbound_rx = self.inbound_rx.lock().take().ok_or(RuntimeError::AlreadyStarted)?;
        let handle = tokio::spawn(main_loop(
            self.bus.clone(),
            self.ipc.clone(),
            inbound_rx,
            self.shutdown_rx.clone(),
        ));
        self.tasks.lock().push(handle);
        info!("Main loop started");
        Ok(())
    }

    /// Open a renderer window and start its pump.
    pub fn open_renderer(&self) -> Renderer {
        let window = WindowId::new(self.next_window.fetch_add(1, Ordering::Relaxed));
        let pushes = self.ipc.open_window(window);
        let events = Arc::new(RendererEvents::new());

        let telemetry = self.config.telemetry.for_renderer(window.get());
        let span = info_span!(
            "renderer",
            service = %telemetry.service_name,
            role = %telemetry.process_role,
        );
        let handle = tokio::spawn(
            pump(window, pushes, events.clone(), self.shutdown_rx.clone()).instrument(span),
        );
        self.tasks.lock().push(handle);

        let port = Arc::new(WindowPort::new(window, self.ipc.clone(), self.bus.clone()));
        Renderer::new(
            port,
            events,
            self.config.correlator_config(),
            self.config.cleanup_interval,
            self.shutdown_rx.clone(),
        )
    }

    /// Close a window. Its pump stops once queued pushes are delivered.
    pub fn close_window(&self, window: WindowId) -> bool {
        self.ipc.close_window(window)
    }

    /// Stop every task and unregister every handler.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Task ended abnormally: {}", e);
            }
        }

        self.bus.shutdown();
        info!("Shutdown complete");
    }
}

async fn main_loop(
    bus: Arc<MainBus>,
    ipc: Arc<LocalIpc>,
    mut inbound_rx: mpsc::UnboundedReceiver<Inbound>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            inbound = inbound_rx.recv() => match inbound {
                Some(inbound) => handle_inbound(&bus, &ipc, inbound),
                None => break,
            },
            _ = shutdown.changed() => {
                info!("[MainLoop] Shutdown signal received");
                break;
            }
        }
    }
}

/// Dispatch one async send.
///
/// A message that does not decode is answered with a `Transport` error when
/// its request id can still be read, and dropped otherwise.
fn handle_inbound(bus: &MainBus, ipc: &LocalIpc, inbound: Inbound) {
    let Inbound { origin, message } = inbound;
    let _span = bus_span!("inbound", message.channel, origin = %origin).entered();

    match message.decode() {
        Ok(envelope) => {
            bus.receive_async(origin, &message.channel, envelope);
        }
        Err(err) => {
            let Some(id) = message.request_id() else {
                warn!("[MainLoop] dropping undecodable message on {}: {}", message.channel, err);
                return;
            };
            warn!("[MainLoop] undecodable request {} on {}: {}", id, message.channel, err);
            let answer = Envelope::new(message.channel.clone(), id, serde_json::Value::Null)
                .with_error(BusError::transport(&message.channel, &err));
            let reply = message.channel.reply();
            if let Err(err) = ipc.send_to_window(origin, &reply, &answer) {
                debug!("[MainLoop] transport error answer to {} not delivered: {}", origin, err);
            }
        }
    }
}

async fn pump(
    window: WindowId,
    mut pushes: mpsc::UnboundedReceiver<WireMessage>,
    events: Arc<RendererEvents>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            message = pushes.recv() => match message {
                Some(message) => match message.decode() {
                    Ok(envelope) => {
                        let delivered = events.deliver(&message.channel, &envelope);
                        debug!("[Pump] {} {} -> {} listeners", window, message.channel, delivered);
                    }
                    Err(err) => warn!("[Pump] {} dropping undecodable push: {}", window, err),
                },
                None => {
                    debug!("[Pump] {} closed", window);
                    break;
                }
            },
            _ = shutdown.changed() => break,
        }
    }
}
