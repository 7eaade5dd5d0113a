//! Handler for the deferred cleanup trigger.
//!
//! Route: `POST /api/v1/runs/cleanup`
//!
//! Responds immediately; the actual scrubbing runs in a detached task
//! after the requested delay. Best-effort by contract: the task is cut
//! short on shutdown, and the batch worker covers anything it missed.

use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use runbridge_core::types::RunId;
use serde::{Deserialize, Serialize};

use crate::background::run_cleanup;
use crate::error::AppResult;
use crate::state::AppState;

/// Request body for the cleanup trigger.
#[derive(Debug, Deserialize)]
pub struct CleanupRunRequest {
    pub run_id: RunId,
    pub delay_seconds: Option<u64>,
}

/// Response body for the cleanup trigger.
#[derive(Debug, Serialize)]
pub struct CleanupRunResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/v1/runs/cleanup
pub async fn cleanup_run(
    State(state): State<AppState>,
    Json(input): Json<CleanupRunRequest>,
) -> AppResult<impl IntoResponse> {
    let delay_seconds = input.delay_seconds.unwrap_or(run_cleanup::DEFAULT_DELAY_SECS);

    tracing::info!(
        run_id = %input.run_id,
        delay_seconds,
        "Scheduling deferred run cleanup"
    );

    tokio::spawn(run_cleanup::run(
        state.pool.clone(),
        input.run_id,
        Duration::from_secs(delay_seconds),
        state.background.clone(),
    ));

    Ok(Json(CleanupRunResponse {
        success: true,
        message: format!(
            "Cleanup of run {} scheduled in {delay_seconds} seconds",
            input.run_id
        ),
    }))
}
