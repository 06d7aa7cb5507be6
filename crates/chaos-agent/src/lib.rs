//! ChaosLab agent.
//!
//! Receives fault specifications from the controller and applies them to the
//! local host using `tc`, `stress-ng`, `ps` and `kill`.
//! Endpoints: /health, /inject

pub mod command;
pub mod executor;
pub mod lease;

mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use chaos_config::AgentConfig;
use chaos_core::WorkQueue;

pub use routes::build_router;
pub use state::AppState;

use crate::command::SystemRunner;
use crate::executor::FaultExecutor;

/// Wire an executor backed by real system commands. Must run inside tokio.
pub fn build_state(config: &AgentConfig) -> AppState {
    let executor = FaultExecutor::new(Arc::new(SystemRunner), config.interface.clone());
    AppState::new(Arc::new(executor), WorkQueue::start("agent"))
}

/// Start the agent API server with graceful shutdown on SIGTERM/SIGINT.
///
/// Faults still running at shutdown are abandoned; a network rule installed
/// by one of them stays on the interface.
pub async fn serve(config: &AgentConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(config);
    let app = build_router(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        interface = %config.interface,
        "ChaosLab agent listening on http://{}",
        addr
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(chaos_core::shutdown_signal())
        .await?;

    let active = state.queue().in_flight();
    if active > 0 {
        tracing::warn!(active, "Shutting down with faults still active");
    }
    tracing::info!("ChaosLab agent shut down gracefully");
    Ok(())
}
