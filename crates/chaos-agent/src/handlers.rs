//! Request handlers for the agent API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use tracing::{error, info};

use chaos_core::{FaultSpecification, StatusResponse, Task};

use crate::state::AppState;

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
    pub interface: String,
    /// Faults currently running.
    pub active_faults: usize,
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

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        interface: state.executor().interface().to_string(),
        active_faults: state.queue().in_flight(),
    })
}

/// Acknowledge a fault and run it in the background.
///
/// The fault type is checked only once the task runs, so an unknown type is
/// acknowledged here and dropped later.
pub async fn inject(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let spec: FaultSpecification = serde_json::from_slice(&body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, "Invalid JSON", e))?;

    info!(
        fault = %spec.experiment_type,
        duration = spec.duration,
        "Received fault injection request"
    );

    let executor = Arc::clone(state.executor());
    let label = format!("fault:{}", spec.experiment_type);
    state
        .queue()
        .submit(Task::new(label, async move {
            executor.execute(&spec).await;
        }))
        .map_err(|e| {
            error!(error = %e, "Failed to queue fault");
            api_error(StatusCode::SERVICE_UNAVAILABLE, "Executor unavailable", e)
        })?;

    Ok(Json(StatusResponse::new(
        "injected",
        "Fault injection in progress",
    )))
}
