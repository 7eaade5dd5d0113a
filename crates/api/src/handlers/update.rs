//! Handler for machine callbacks.
//!
//! Route: `POST /api/v1/runs/update`
//!
//! Machines report either a status transition or an output payload per
//! request, never both. Output payloads are sanitized and their URLs
//! rewritten before the append-only insert; status transitions go
//! through the guarded transition table -- an out-of-order report is
//! logged and skipped rather than silently applied, but the endpoint
//! still answers success because the machine cannot act on a rejection.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use runbridge_core::error::CoreError;
use runbridge_core::sanitize::{rewrite_image_urls, sanitize_output};
use runbridge_core::status::RunStatus;
use runbridge_core::types::RunId;
use runbridge_db::repositories::{RunOutputRepo, RunRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Request body for the update callback.
#[derive(Debug, Deserialize)]
pub struct UpdateRunRequest {
    pub run_id: RunId,
    pub status: Option<String>,
    pub output_data: Option<serde_json::Value>,
}

/// Response body for the update callback.
#[derive(Debug, Serialize)]
pub struct UpdateRunResponse {
    pub message: &'static str,
}

/// POST /api/v1/runs/update
pub async fn update_run(
    State(state): State<AppState>,
    Json(input): Json<UpdateRunRequest>,
) -> AppResult<impl IntoResponse> {
    if input.status.is_some() && input.output_data.is_some() {
        return Err(AppError::BadRequest(
            "status and output_data are mutually exclusive".to_string(),
        ));
    }

    let run = RunRepo::find_by_id(&state.pool, input.run_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Run" }))?;

    if let Some(output_data) = input.output_data {
        let mut clean = sanitize_output(&output_data);
        rewrite_image_urls(&mut clean, &state.config.urls, run.id, true);
        RunOutputRepo::insert(&state.pool, run.id, &clean).await?;
        tracing::debug!(run_id = %run.id, "Stored output payload");
    } else if let Some(status_name) = input.status {
        let next = RunStatus::from_name(&status_name).map_err(AppError::Core)?;
        let current = RunStatus::from_name(&run.status)
            .map_err(|_| AppError::InternalError(format!("run {} has corrupt status", run.id)))?;

        if current.can_transition(next) {
            RunRepo::update_status(&state.pool, run.id, next).await?;
            tracing::info!(run_id = %run.id, from = %current, to = %next, "Run status updated");
        } else {
            tracing::warn!(
                run_id = %run.id,
                from = %current,
                to = %next,
                "Skipping out-of-order status report"
            );
        }
    } else {
        return Err(AppError::BadRequest(
            "one of status or output_data is required".to_string(),
        ));
    }

    Ok(Json(UpdateRunResponse { message: "success" }))
}
