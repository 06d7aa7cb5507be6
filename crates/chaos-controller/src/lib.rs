//! ChaosLab controller.
//!
//! Accepts experiment definitions over HTTP, records them, and dispatches
//! the derived fault specification to agents, now or at the requested
//! start time. Endpoints: /health, /start, /stop, /experiments

pub mod client;
pub mod dispatcher;
pub mod registry;
pub mod scheduler;

mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use chaos_config::ControllerConfig;
use chaos_core::{AgentEndpoint, SystemClock, WorkQueue};

pub use routes::build_router;
pub use state::AppState;

use crate::client::HttpAgentClient;
use crate::dispatcher::Dispatcher;
use crate::scheduler::Scheduler;

/// Wire the registry, HTTP agent client, dispatcher and scheduler from config.
///
/// Must be called from within a tokio runtime; the scheduler's work queue
/// starts here.
pub fn build_state(config: &ControllerConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let log = registry::open_log(&config.registry)?;
    let client = HttpAgentClient::new(config.request_timeout())?;
    let endpoints = config
        .agents
        .iter()
        .cloned()
        .map(AgentEndpoint::from)
        .collect::<Vec<_>>();
    tracing::info!(agents = endpoints.len(), "Configured agent endpoints");

    let dispatcher = Dispatcher::new(endpoints, Arc::new(client));
    let scheduler = Scheduler::new(
        WorkQueue::start("controller"),
        Arc::new(dispatcher),
        Arc::new(SystemClock),
    );
    Ok(AppState::with_max_agent_count(
        log,
        scheduler,
        config.max_agent_count,
    ))
}

/// Start the controller API server with graceful shutdown on SIGTERM/SIGINT.
pub async fn serve(config: &ControllerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(config)?;
    let app = build_router(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ChaosLab controller listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(chaos_core::shutdown_signal())
        .await?;

    state.scheduler().queue().close();
    let pending = state.scheduler().queue().in_flight();
    if pending > 0 {
        tracing::warn!(pending, "Shutting down with experiments still pending; they are dropped");
    }
    tracing::info!("ChaosLab controller shut down gracefully");
    Ok(())
}
