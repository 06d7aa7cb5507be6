//! Request handlers for the controller API.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use tracing::{error, info, warn};

use chaos_core::{ExperimentDefinition, ExperimentRecord, StatusResponse};

use crate::scheduler::ScheduleDecision;
use crate::state::AppState;

// --- Response types ---

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Dispatch tasks queued or waiting on their start time.
    pub pending_tasks: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str, detail: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            detail: Some(detail.to_string()),
        }),
    )
}

// --- Handlers ---

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        pending_tasks: state.scheduler().queue().in_flight(),
    })
}

/// Accept an experiment, record it, and hand it to the scheduler.
///
/// The response only reflects structural validity. Dispatch outcomes are
/// visible in the logs, never here. Nothing is recorded when the request is
/// rejected, so `/experiments` only lists experiments handed to the scheduler.
pub async fn start(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let definition: ExperimentDefinition = serde_json::from_slice(&body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "Invalid JSON", e))?;

    info!(
        experiment = %definition.name,
        fault = %definition.experiment_type,
        parallel = definition.parallel,
        agent_count = definition.agent_count,
        "Received experiment request"
    );

    let max = state.max_agent_count();
    if definition.parallel && definition.agent_count > i64::try_from(max).unwrap_or(i64::MAX) {
        warn!(
            experiment = %definition.name,
            agent_count = definition.agent_count,
            max,
            "Rejecting experiment with oversized fan-out"
        );
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid experiment",
            format!(
                "agent_count {} exceeds the maximum of {}",
                definition.agent_count, max
            ),
        ));
    }

    if state.scheduler().queue().is_closed() {
        warn!(experiment = %definition.name, "Scheduler closed, rejecting experiment");
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Scheduler unavailable",
            "controller is shutting down",
        ));
    }

    let record = state.log().record(definition.clone()).map_err(|e| {
        error!(experiment = %definition.name, error = %e, "Failed to record experiment");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to record experiment", e)
    })?;

    let decision = state.scheduler().schedule(definition).map_err(|e| {
        error!(
            id = record.id,
            error = %e,
            "Failed to schedule experiment; the recorded entry will never be dispatched"
        );
        api_error(StatusCode::SERVICE_UNAVAILABLE, "Scheduler unavailable", e)
    })?;

    let message = match decision {
        ScheduleDecision::Immediate => "Experiment started immediately.".to_string(),
        ScheduleDecision::Delayed(delay) => {
            format!("Experiment scheduled to start in {}s.", delay.as_secs())
        }
    };
    Ok(Json(StatusResponse::new("scheduled", message)))
}

/// Accepted but does nothing: running faults cannot be stopped. The reply
/// is a 200 whose message says so.
pub async fn stop() -> Json<StatusResponse> {
    info!("Stop experiment endpoint called (not implemented)");
    Json(StatusResponse::new("stopped", "not implemented"))
}

/// Every accepted experiment, in submission order.
pub async fn experiments(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExperimentRecord>>, ApiError> {
    state.log().list().map(Json).map_err(|e| {
        error!(error = %e, "Failed to list experiments");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list experiments", e)
    })
}
