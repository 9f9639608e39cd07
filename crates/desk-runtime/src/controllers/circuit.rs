//! Circuit controller: the "what the fuck" troubleshooting sessions a
//! developer opens, pauses, solves or cancels.
//!
//! State lives in memory; the REST client of the full application is out
//! of scope here. Start and solve notify every window through the console
//! view channels.

use super::{string_arg, ControllerArgError};
use chrono::{DateTime, Utc};
use desk_bus::{ControllerRouter, Delivery, Handler, HandlerContext, MainBus};
use desk_types::catalog;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const LOAD_ALL_MY_PARTICIPATING_CIRCUITS: &str = "load-all-my-participating-circuits";
pub const LOAD_ALL_MY_DO_IT_LATER_CIRCUITS: &str = "load-all-my-do-it-later-circuits";
pub const LOAD_ACTIVE_CIRCUIT: &str = "load-active-circuit";
pub const LOAD_CIRCUIT_WITH_ALL_DETAILS: &str = "load-circuit-with-all-details";
pub const START_WTF: &str = "start-wtf";
pub const PAUSE_WTF: &str = "pause-wtf";
pub const SOLVE_WTF: &str = "solve-wtf";
pub const CANCEL_WTF: &str = "cancel-wtf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Troubleshoot,
    OnHold,
    Solved,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningCircuit {
    pub id: String,
    pub circuit_name: String,
    pub owner: String,
    pub circuit_state: CircuitState,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum CircuitError {
    #[error("circuit '{0}' does not exist")]
    UnknownCircuit(String),

    #[error("'{0}' is already troubleshooting '{1}'")]
    AlreadyActive(String, String),
}

/// In-memory circuit store.
#[derive(Debug, Default)]
pub struct CircuitStore {
    circuits: RwLock<Vec<LearningCircuit>>,
}

impl CircuitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, owner: &str, name: Option<String>) -> Result<LearningCircuit, CircuitError> {
        let mut circuits = self.circuits.write();
        if let Some(active) = circuits
            .iter()
            .find(|c| c.owner == owner && c.circuit_state == CircuitState::Troubleshoot)
        {
            return Err(CircuitError::AlreadyActive(
                owner.to_string(),
                active.circuit_name.clone(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let circuit = LearningCircuit {
            circuit_name: name.unwrap_or_else(|| format!("wtf_{}", &id[..8])),
            id,
            owner: owner.to_string(),
            circuit_state: CircuitState::Troubleshoot,
            opened_at: Utc::now(),
            closed_at: None,
        };
        circuits.push(circuit.clone());
        Ok(circuit)
    }

    pub fn active(&self, owner: &str) -> Option<LearningCircuit> {
        self.circuits
            .read()
            .iter()
            .find(|c| c.owner == owner && c.circuit_state == CircuitState::Troubleshoot)
            .cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<LearningCircuit> {
        self.circuits
            .read()
            .iter()
            .find(|c| c.circuit_name == name)
            .cloned()
    }

    pub fn with_state(&self, state: CircuitState) -> Vec<LearningCircuit> {
        self.circuits
            .read()
            .iter()
            .filter(|c| c.circuit_state == state)
            .cloned()
            .collect()
    }

    /// Open circuits, on hold or not.
    pub fn participating(&self) -> Vec<LearningCircuit> {
        self.circuits
            .read()
            .iter()
            .filter(|c| matches!(c.circuit_state, CircuitState::Troubleshoot | CircuitState::OnHold))
            .cloned()
            .collect()
    }

    pub fn transition(&self, name: &str, state: CircuitState) -> Result<LearningCircuit, CircuitError> {
        let mut circuits = self.circuits.write();
        let circuit = circuits
            .iter_mut()
            .find(|c| c.circuit_name == name)
            .ok_or_else(|| CircuitError::UnknownCircuit(name.to_string()))?;

        circuit.circuit_state = state;
        if matches!(state, CircuitState::Solved | CircuitState::Canceled) {
            circuit.closed_at = Some(Utc::now());
        }
        Ok(circuit.clone())
    }
}

fn circuit_name(args: &Value) -> Result<&str, ControllerArgError> {
    string_arg(args, "circuitName")
}

fn owner(args: &Value) -> &str {
    args.get("owner").and_then(Value::as_str).unwrap_or("me")
}

fn notify_views(ctx: &HandlerContext<'_>, channel: &str, circuit: &LearningCircuit) -> anyhow::Result<()> {
    let report = ctx.emit(channel, serde_json::to_value(circuit)?);
    info!(
        "[CircuitController] {} {} -> {} windows",
        channel,
        circuit.circuit_name,
        report.windows_reached.len()
    );
    Ok(())
}

/// Action router for `ipc-circuit-client`.
pub fn router(store: Arc<CircuitStore>) -> ControllerRouter {
    let participating = store.clone();
    let later = store.clone();
    let active = store.clone();
    let details = store.clone();
    let start = store.clone();
    let pause = store.clone();
    let solve = store.clone();
    let cancel = store;

    ControllerRouter::new("CircuitController")
        .action(LOAD_ALL_MY_PARTICIPATING_CIRCUITS, move |_, _| {
            Ok(serde_json::to_value(participating.participating())?)
        })
        .action(LOAD_ALL_MY_DO_IT_LATER_CIRCUITS, move |_, _| {
            Ok(serde_json::to_value(later.with_state(CircuitState::OnHold))?)
        })
        .action(LOAD_ACTIVE_CIRCUIT, move |_, args| {
            Ok(serde_json::to_value(active.active(owner(args)))?)
        })
        .action(LOAD_CIRCUIT_WITH_ALL_DETAILS, move |_, args| {
            let name = circuit_name(args)?;
            let circuit = details
                .by_name(name)
                .ok_or_else(|| CircuitError::UnknownCircuit(name.to_string()))?;
            Ok(serde_json::to_value(circuit)?)
        })
        .action(START_WTF, move |ctx, args| {
            let name = args.get("circuitName").and_then(Value::as_str).map(str::to_string);
            let circuit = start.start(owner(args), name)?;
            notify_views(ctx, catalog::VIEW_CONSOLE_CIRCUIT_START_STOP, &circuit)?;
            Ok(serde_json::to_value(circuit)?)
        })
        .action(PAUSE_WTF, move |ctx, args| {
            let circuit = pause.transition(circuit_name(args)?, CircuitState::OnHold)?;
            notify_views(ctx, catalog::VIEW_CONSOLE_CIRCUIT_PAUSE_RESUME, &circuit)?;
            Ok(serde_json::to_value(circuit)?)
        })
        .action(SOLVE_WTF, move |ctx, args| {
            let circuit = solve.transition(circuit_name(args)?, CircuitState::Solved)?;
            notify_views(ctx, catalog::VIEW_CONSOLE_CIRCUIT_SOLVE, &circuit)?;
            Ok(serde_json::to_value(circuit)?)
        })
        .action(CANCEL_WTF, move |ctx, args| {
            let circuit = cancel.transition(circuit_name(args)?, CircuitState::Canceled)?;
            notify_views(ctx, catalog::VIEW_CONSOLE_CIRCUIT_START_STOP, &circuit)?;
            Ok(serde_json::to_value(circuit)?)
        })
}

/// Register the circuit controller on the bus.
pub fn register(bus: &MainBus, store: Arc<CircuitStore>) -> Handler {
    bus.register(
        router(store)
            .registration(catalog::CIRCUIT_CLIENT)
            .delivery(Delivery::Deferred),
    )
}
