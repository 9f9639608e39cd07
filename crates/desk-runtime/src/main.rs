//! Circuit Desk runtime binary.
//!
//! Starts the main bus with its controllers, opens the configured renderer
//! windows and runs until Ctrl+C.

use anyhow::{Context, Result};
use desk_runtime::controllers::circuit::{self, LearningCircuit};
use desk_runtime::{DeskConfig, DeskRuntime, Renderer};
use desk_telemetry::init_telemetry;
use desk_types::catalog;
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = DeskConfig::from_env();
    let _telemetry = init_telemetry(config.telemetry.clone()).context("Failed to initialize telemetry")?;

    info!("===========================================");
    info!("  Circuit Desk Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let windows = config.windows;
    let runtime = DeskRuntime::new(config).context("Failed to create runtime")?;
    runtime.start().context("Failed to start main loop")?;

    let renderers: Vec<Renderer> = (0..windows).map(|_| runtime.open_renderer()).collect();
    info!("{} renderer windows open", renderers.len());

    if let Some(renderer) = renderers.first() {
        let circuits = renderer.client(catalog::CIRCUIT_CLIENT, "Console");
        let reply = circuits
            .call(json!({"action": circuit::LOAD_ACTIVE_CIRCUIT}))
            .await
            .context("Circuit controller did not answer")?;
        let active: Option<LearningCircuit> = reply
            .data_as::<Option<LearningCircuit>>()
            .context("Malformed circuit reply")?
            .flatten();
        info!(
            "Active circuit: {}",
            active.map_or_else(|| "none".to_string(), |c| c.circuit_name)
        );
    }

    info!("Desk is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
