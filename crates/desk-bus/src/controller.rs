//! # Controller Action Routing
//!
//! Feature controllers multiplex several actions over one channel. The
//! renderer puts the action name in `args.action`; the router picks the
//! matching action function and hands it the full `args`.

use crate::dispatcher::HandlerContext;
use crate::handler::{handler_fn, HandlerFn, Registration};
use desk_types::{Channel, Scope};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Key carrying the action name inside `args`.
pub const ACTION_KEY: &str = "action";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("{scope} received a request without an action")]
    MissingAction { scope: Scope },

    #[error("{scope} does not handle action '{action}'")]
    UnknownAction { scope: Scope, action: String },
}

/// Maps action names to functions for one controller.
pub struct ControllerRouter {
    scope: Scope,
    actions: HashMap<String, HandlerFn>,
}

impl ControllerRouter {
    pub fn new(scope: impl Into<Scope>) -> Self {
        Self {
            scope: scope.into(),
            actions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&HandlerContext<'_>, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), handler_fn(action));
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Run the action named in `args`.
    pub fn route(&self, ctx: &HandlerContext<'_>, args: &Value) -> anyhow::Result<Value> {
        let name = args
            .get(ACTION_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| ControllerError::MissingAction {
                scope: self.scope.clone(),
            })?;

        let action = self
            .actions
            .get(name)
            .ok_or_else(|| ControllerError::UnknownAction {
                scope: self.scope.clone(),
                action: name.to_string(),
            })?;

        debug!("[Controller] {} -> {}", self.scope, name);
        action(ctx, args)
    }

    /// Turn the router into a handler callback.
    pub fn into_callback(self) -> HandlerFn {
        let router = Arc::new(self);
        handler_fn(move |ctx, args| router.route(ctx, args))
    }

    /// Registration for `channel` routed through this controller.
    pub fn registration(self, channel: impl Into<Channel>) -> Registration {
        let scope = self.scope.clone();
        Registration::with_callback_fn(channel, scope, self.into_callback())
    }
}
