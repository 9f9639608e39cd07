//! # Registered Handlers
//!
//! A handler binds a callback (and optionally a reply function) to one
//! channel. Handlers are shared as [`Handler`] (`Arc<RegisteredHandler>`)
//! and compared by [`HandlerId`], never by channel name, so two handlers on
//! the same channel stay independently removable.

use crate::dispatcher::HandlerContext;
use desk_types::{BusError, Channel, Scope};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Signature shared by callbacks and reply functions.
///
/// An `Err` is the handler's failure; the dispatcher turns it into a
/// [`BusError`] and keeps going.
pub type HandlerFn = Arc<dyn Fn(&HandlerContext<'_>, &Value) -> anyhow::Result<Value> + Send + Sync>;

/// Box a closure as a [`HandlerFn`].
pub fn handler_fn<F>(f: F) -> HandlerFn
where
    F: Fn(&HandlerContext<'_>, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Result of one callback or reply invocation.
pub type Outcome = Result<Value, BusError>;

/// Shared handle to a registered handler.
pub type Handler = Arc<RegisteredHandler>;

/// Process-unique handler identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// When the originating window hears back from a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// A synchronous request gets the result as its return value only; an
    /// asynchronous one still gets it once on `<channel>-reply`.
    #[default]
    Inline,
    /// The result is pushed on `<channel>-reply` for every request,
    /// synchronous ones included.
    Deferred,
}

/// Lifecycle of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Active,
    /// Unregistered; kept alive only by outstanding references.
    Inactive,
    /// Unregistered and stripped of its functions.
    Destroyed,
}

/// Last callback and reply results of a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnValues {
    pub callback: Option<Outcome>,
    pub reply: Option<Outcome>,
}

impl ReturnValues {
    /// The captured error of this pass, callback first.
    pub fn error(&self) -> Option<&BusError> {
        match (&self.callback, &self.reply) {
            (Some(Err(err)), _) => Some(err),
            (_, Some(Err(err))) => Some(err),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub(crate) struct HandlerFns {
    pub(crate) callback: HandlerFn,
    pub(crate) reply: Option<HandlerFn>,
}

/// A handler owned by the channel registry.
pub struct RegisteredHandler {
    id: HandlerId,
    channel: Channel,
    scope: Scope,
    delivery: Delivery,
    functions: RwLock<Option<HandlerFns>>,
    state: RwLock<HandlerState>,
    return_values: Mutex<ReturnValues>,
}

impl RegisteredHandler {
    pub(crate) fn new(id: HandlerId, registration: Registration) -> Self {
        Self {
            id,
            channel: registration.channel,
            scope: registration.scope,
            delivery: registration.delivery,
            functions: RwLock::new(Some(HandlerFns {
                callback: registration.callback,
                reply: registration.reply,
            })),
            state: RwLock::new(HandlerState::Active),
            return_values: Mutex::new(ReturnValues::default()),
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub fn state(&self) -> HandlerState {
        *self.state.read()
    }

    pub fn is_active(&self) -> bool {
        self.state() == HandlerState::Active
    }

    pub fn has_reply(&self) -> bool {
        self.functions
            .read()
            .as_ref()
            .is_some_and(|fns| fns.reply.is_some())
    }

    /// Copy of the last callback/reply results.
    pub fn return_values(&self) -> ReturnValues {
        self.return_values.lock().clone()
    }

    /// Functions to invoke, or `None` once destroyed.
    pub(crate) fn functions(&self) -> Option<HandlerFns> {
        self.functions.read().clone()
    }

    pub(crate) fn reset_return_values(&self) {
        *self.return_values.lock() = ReturnValues::default();
    }

    pub(crate) fn record_callback(&self, outcome: Outcome) {
        self.return_values.lock().callback = Some(outcome);
    }

    pub(crate) fn record_reply(&self, outcome: Outcome) {
        self.return_values.lock().reply = Some(outcome);
    }

    pub(crate) fn deactivate(&self) {
        let mut state = self.state.write();
        if *state == HandlerState::Active {
            *state = HandlerState::Inactive;
        }
    }

    pub(crate) fn strip(&self) {
        *self.state.write() = HandlerState::Destroyed;
        *self.functions.write() = None;
        *self.return_values.lock() = ReturnValues::default();
    }
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("scope", &self.scope)
            .field("delivery", &self.delivery)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Everything needed to register a handler.
///
/// A registration always carries a callback; the reply function is optional.
///
/// ```ignore
/// let handler = bus.register(
///     Registration::new(catalog::CIRCUIT_CLIENT, "CircuitController", |_ctx, args| {
///         Ok(json!({"ok": true, "n": args["n"]}))
///     })
///     .deferred(),
/// );
/// ```
pub struct Registration {
    pub(crate) channel: Channel,
    pub(crate) scope: Scope,
    pub(crate) callback: HandlerFn,
    pub(crate) reply: Option<HandlerFn>,
    pub(crate) delivery: Delivery,
}

impl Registration {
    pub fn new<F>(channel: impl Into<Channel>, scope: impl Into<Scope>, callback: F) -> Self
    where
        F: Fn(&HandlerContext<'_>, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::with_callback_fn(channel, scope, handler_fn(callback))
    }

    /// Like [`Registration::new`] with an already boxed callback.
    pub fn with_callback_fn(
        channel: impl Into<Channel>,
        scope: impl Into<Scope>,
        callback: HandlerFn,
    ) -> Self {
        Self {
            channel: channel.into(),
            scope: scope.into(),
            callback,
            reply: None,
            delivery: Delivery::Inline,
        }
    }

    #[must_use]
    pub fn on_reply<F>(mut self, reply: F) -> Self
    where
        F: Fn(&HandlerContext<'_>, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.reply = Some(handler_fn(reply));
        self
    }

    #[must_use]
    pub fn delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Shorthand for [`Delivery::Deferred`].
    #[must_use]
    pub fn deferred(self) -> Self {
        self.delivery(Delivery::Deferred)
    }
}
