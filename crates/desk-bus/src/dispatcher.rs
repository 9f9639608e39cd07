//! # Dispatcher
//!
//! One dispatch pass turns an inbound envelope into zero or more handler
//! invocations:
//!
//! 1. snapshot the active handlers of the channel, in registration order;
//! 2. run each handler's callback, then its reply function when the callback
//!    succeeded; failures are captured into the envelope, never propagated;
//! 3. push the envelope on `<channel>-reply` to the originating window when a
//!    deferred handler matched, or always for an asynchronous request;
//! 4. broadcast the envelope on the unchanged channel when the channel fans
//!    out to every window, whether or not any handler matched.
//!
//! Passes run one at a time behind a re-entrant dispatch lock. A pass
//! started on another thread waits for the current one; a callback on the
//! dispatching thread may still register, unregister, or dispatch through
//! its [`HandlerContext`]. No registry lock is held while a callback runs.

use crate::config::{BusConfig, FanOut};
use crate::handler::{Delivery, Handler, HandlerId, Outcome, Registration, ReturnValues};
use crate::registry::ChannelRegistry;
use crate::stats::{BusStats, BusStatsSnapshot};
use crate::transport::{MainTransport, WindowRegistry};
use desk_types::{BusError, Channel, Envelope, RequestId, Scope, TransportError, WindowId};
use parking_lot::ReentrantMutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, debug_span, error, info, warn};

/// What a running callback can see and do.
pub struct HandlerContext<'a> {
    handler: &'a Handler,
    request_id: &'a RequestId,
    origin: Option<WindowId>,
    bus: &'a MainBus,
}

impl<'a> HandlerContext<'a> {
    pub fn handler_id(&self) -> HandlerId {
        self.handler.id()
    }

    pub fn channel(&self) -> &Channel {
        self.handler.channel()
    }

    pub fn scope(&self) -> &Scope {
        self.handler.scope()
    }

    pub fn request_id(&self) -> &RequestId {
        self.request_id
    }

    /// Window that sent the request, `None` for main-internal dispatch.
    pub fn origin(&self) -> Option<WindowId> {
        self.origin
    }

    pub fn bus(&self) -> &'a MainBus {
        self.bus
    }

    /// Dispatch a follow-up event on the main side.
    pub fn emit(&self, channel: impl Into<Channel>, args: Value) -> DispatchReport {
        self.bus.emit(channel, args)
    }

    /// Push an envelope straight back to the requesting window.
    pub fn send_to_origin(
        &self,
        channel: impl Into<Channel>,
        args: Value,
    ) -> Result<(), TransportError> {
        let window = self.origin.ok_or(TransportError::Disconnected)?;
        let channel = channel.into();
        let envelope = Envelope::new(channel.clone(), self.request_id.clone(), args);
        self.bus.transport.send_to_window(window, &channel, &envelope)
    }
}

/// Per-handler outcome of one pass.
#[derive(Debug, Clone)]
pub struct HandlerResult {
    pub handler: HandlerId,
    pub channel: Channel,
    pub scope: Scope,
    pub return_values: ReturnValues,
}

impl HandlerResult {
    pub fn callback(&self) -> Option<&Outcome> {
        self.return_values.callback.as_ref()
    }

    pub fn reply(&self) -> Option<&Outcome> {
        self.return_values.reply.as_ref()
    }

    pub fn is_ok(&self) -> bool {
        self.return_values.error().is_none()
    }
}

/// Everything one dispatch pass produced.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Envelope after all handlers ran.
    pub envelope: Envelope,
    /// One entry per invoked handler, in registration order.
    pub results: Vec<HandlerResult>,
    /// A deferred handler matched.
    pub deferred: bool,
    /// Windows that received the broadcast.
    pub windows_reached: Vec<WindowId>,
}

impl DispatchReport {
    pub fn matched(&self) -> bool {
        !self.results.is_empty()
    }
}

/// The main-process bus: channel registry, dispatcher, and broadcaster.
///
/// Created once at startup and handed to every feature module that needs to
/// register channels.
pub struct MainBus {
    registry: ChannelRegistry,
    transport: Arc<dyn MainTransport>,
    windows: Arc<dyn WindowRegistry>,
    config: BusConfig,
    stats: BusStats,
    dispatch_lock: ReentrantMutex<()>,
}

impl MainBus {
    pub fn new(
        transport: Arc<dyn MainTransport>,
        windows: Arc<dyn WindowRegistry>,
        config: BusConfig,
    ) -> Self {
        info!("[MainBus] created with default fan-out {:?}", config.default_fan_out);
        Self {
            registry: ChannelRegistry::new(transport.clone()),
            transport,
            windows,
            config,
            stats: BusStats::default(),
            dispatch_lock: ReentrantMutex::new(()),
        }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn register(&self, registration: Registration) -> Handler {
        self.registry.register(registration)
    }

    pub fn unregister(&self, handler: &Handler) -> Option<Handler> {
        self.registry.unregister(handler)
    }

    pub fn destroy(&self, handler: Handler) -> Option<Handler> {
        self.registry.destroy(handler)
    }

    /// Dispatch a fresh envelope built from `args`.
    pub fn emit(&self, channel: impl Into<Channel>, args: Value) -> DispatchReport {
        let channel = channel.into();
        let envelope = Envelope::request(channel.clone(), args);
        self.dispatch(&channel, envelope)
    }

    /// Main-internal dispatch: run handlers, then broadcast per fan-out.
    pub fn dispatch(&self, channel: &Channel, envelope: Envelope) -> DispatchReport {
        let _serial = self.dispatch_lock.lock();
        let mut report = self.run_handlers(channel, envelope, None);
        report.windows_reached = self.fan_out(channel, &report.envelope);
        report
    }

    /// Handle a synchronous request sent by a renderer window.
    ///
    /// The returned envelope is the answer to the sender. When a deferred
    /// handler matched, the same envelope is also pushed to the sender on
    /// `<channel>-reply`.
    pub fn receive(&self, origin: WindowId, channel: &Channel, envelope: Envelope) -> Envelope {
        let _serial = self.dispatch_lock.lock();
        let report = self.run_handlers(channel, envelope, Some(origin));

        if report.deferred {
            self.push_reply(origin, channel, &report.envelope);
        }
        self.fan_out(channel, &report.envelope);
        Self::answer(channel, report)
    }

    /// Handle a request whose sender waits on `<channel>-reply`.
    ///
    /// Exactly one envelope goes back to the sender, whether the matching
    /// handlers were deferred, inline, or absent. With no handler it carries
    /// an `UnknownChannel` error.
    pub fn receive_async(&self, origin: WindowId, channel: &Channel, envelope: Envelope) -> Envelope {
        let _serial = self.dispatch_lock.lock();
        let report = self.run_handlers(channel, envelope, Some(origin));
        let broadcast = report.envelope.clone();

        let answer = Self::answer(channel, report);
        self.push_reply(origin, channel, &answer);
        self.fan_out(channel, &broadcast);
        answer
    }

    fn answer(channel: &Channel, report: DispatchReport) -> Envelope {
        let mut answer = report.envelope;
        if report.results.is_empty() {
            answer.capture_error(BusError::unknown_channel(channel));
        }
        answer
    }

    /// Run one handler against `envelope`, recording its return values.
    ///
    /// Returns `None` when the handler was unregistered or destroyed after
    /// the snapshot.
    pub fn handle_one(
        &self,
        handler: &Handler,
        envelope: &mut Envelope,
        origin: Option<WindowId>,
    ) -> Option<HandlerResult> {
        let _serial = self.dispatch_lock.lock();
        if !handler.is_active() {
            debug!("[MainBus] skip {} handler {}", handler.channel(), handler.id());
            return None;
        }
        let functions = handler.functions()?;
        handler.reset_return_values();
        BusStats::incr(&self.stats.handler_invocations);

        let request_id = envelope.id.clone();
        let ctx = HandlerContext {
            handler,
            request_id: &request_id,
            origin,
            bus: self,
        };
        let args = envelope.args.clone();

        match (functions.callback)(&ctx, &args) {
            Ok(value) => {
                handler.record_callback(Ok(value.clone()));
                envelope.data = Some(value);

                if let Some(reply) = &functions.reply {
                    debug!("[MainBus] execute reply -> {}", handler.channel().reply());
                    match reply(&ctx, &args) {
                        Ok(value) => handler.record_reply(Ok(value)),
                        Err(err) => {
                            let captured = BusError::reply(handler.channel(), &err);
                            error!(
                                handler = %handler.id(),
                                trace = ?captured.trace,
                                "[MainBus] {}",
                                captured
                            );
                            BusStats::incr(&self.stats.handler_failures);
                            handler.record_reply(Err(captured.clone()));
                            envelope.capture_error(captured);
                        }
                    }
                }
            }
            Err(err) => {
                let captured = BusError::callback(handler.channel(), &err);
                error!(
                    handler = %handler.id(),
                    trace = ?captured.trace,
                    "[MainBus] {}",
                    captured
                );
                BusStats::incr(&self.stats.handler_failures);
                handler.record_callback(Err(captured.clone()));
                envelope.capture_error(captured);
            }
        }

        Some(HandlerResult {
            handler: handler.id(),
            channel: handler.channel().clone(),
            scope: handler.scope().clone(),
            return_values: handler.return_values(),
        })
    }

    fn run_handlers(
        &self,
        channel: &Channel,
        mut envelope: Envelope,
        origin: Option<WindowId>,
    ) -> DispatchReport {
        let _span = debug_span!("dispatch", channel = %channel, id = %envelope.id).entered();
        BusStats::incr(&self.stats.dispatches);

        let handlers = self.registry.handlers_for(channel);
        debug!("[MainBus] dispatch {} to {} handlers", channel, handlers.len());

        let mut results = Vec::with_capacity(handlers.len());
        let mut deferred = false;
        for handler in &handlers {
            if let Some(result) = self.handle_one(handler, &mut envelope, origin) {
                deferred |= handler.delivery() == Delivery::Deferred;
                results.push(result);
            }
        }

        if results.is_empty() {
            BusStats::incr(&self.stats.unknown_channels);
            debug!("[MainBus] no handlers matched {}", channel);
        }

        DispatchReport {
            envelope,
            results,
            deferred,
            windows_reached: Vec::new(),
        }
    }

    fn push_reply(&self, origin: WindowId, channel: &Channel, envelope: &Envelope) {
        let reply = channel.reply();
        match self.transport.send_to_window(origin, &reply, envelope) {
            Ok(()) => {
                BusStats::incr(&self.stats.deferred_replies);
                debug!("[MainBus] reply event -> {} : {}", reply, origin);
            }
            Err(TransportError::WindowClosed(window)) => {
                debug!("[MainBus] origin {} closed before reply on {}", window, reply);
            }
            Err(err) => warn!("[MainBus] reply on {} to {} failed: {}", reply, origin, err),
        }
    }

    fn fan_out(&self, channel: &Channel, envelope: &Envelope) -> Vec<WindowId> {
        match self.config.fan_out(channel) {
            FanOut::AllWindows => self.broadcast(channel, envelope),
            FanOut::OriginOnly => Vec::new(),
        }
    }

    /// Push `envelope` on `channel` to every open window.
    ///
    /// Windows that close while the broadcast is under way are skipped.
    pub fn broadcast(&self, channel: &Channel, envelope: &Envelope) -> Vec<WindowId> {
        let mut reached = Vec::new();
        for window in self.windows.windows() {
            match self.transport.send_to_window(window, channel, envelope) {
                Ok(()) => reached.push(window),
                Err(TransportError::WindowClosed(_)) => {
                    BusStats::incr(&self.stats.closed_windows_skipped);
                    debug!("[MainBus] skip closed {} for {}", window, channel);
                }
                Err(err) => warn!("[MainBus] broadcast {} to {} failed: {}", channel, window, err),
            }
        }
        BusStats::add(&self.stats.broadcast_deliveries, reached.len() as u64);
        debug!("[MainBus] broadcast {} to {} windows", channel, reached.len());
        reached
    }

    pub fn stats(&self) -> BusStatsSnapshot {
        self.stats.snapshot()
    }

    /// Unregister every handler.
    pub fn shutdown(&self) {
        let removed = self.registry.clear();
        info!("[MainBus] shutdown, {} handlers removed", removed);
    }
}
