//! # Feature Controllers
//!
//! Main-process controllers answering the renderer clients. Each one is a
//! [`ControllerRouter`](desk_bus::ControllerRouter) over an in-memory store,
//! registered with deferred delivery so the answer travels back on
//! `<channel>-reply`.

pub mod circuit;
pub mod journal;

use desk_bus::{Handler, MainBus};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub use circuit::CircuitStore;
pub use journal::JournalStore;

/// Bad arguments in a controller request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerArgError {
    #[error("missing argument '{0}'")]
    Missing(&'static str),

    #[error("argument '{0}' must be a string")]
    NotAString(&'static str),
}

/// Read a required string argument.
pub(crate) fn string_arg<'a>(args: &'a Value, key: &'static str) -> Result<&'a str, ControllerArgError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ControllerArgError::Missing(key)),
        Some(value) => value.as_str().ok_or(ControllerArgError::NotAString(key)),
    }
}

/// Stores backing the controllers.
#[derive(Debug, Default, Clone)]
pub struct Stores {
    pub circuits: Arc<CircuitStore>,
    pub journal: Arc<JournalStore>,
}

/// Register every controller on `bus`.
pub fn register_all(bus: &MainBus, stores: &Stores) -> Vec<Handler> {
    vec![
        circuit::register(bus, stores.circuits.clone()),
        journal::register(bus, stores.journal.clone()),
    ]
}
