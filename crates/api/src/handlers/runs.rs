//! Handlers for run creation and status polling.
//!
//! Routes:
//! - `POST /api/v1/runs`                  — create a run
//! - `GET  /api/v1/runs/{run_id}/status`  — poll run status

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use runbridge_core::error::CoreError;
use runbridge_core::machine::{ORIGIN_API, ORIGIN_MANUAL};
use runbridge_core::report::build_status_report;
use runbridge_core::status::RunStatus;
use runbridge_core::types::{DbId, RunId, Timestamp};
use runbridge_db::repositories::{RunOutputRepo, RunRepo};
use runbridge_machines::{dispatch, CreateRunParams};
use serde::{Deserialize, Serialize};

use crate::auth::MaybeApiUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The status endpoint returns at most this many output payloads.
/// Machines can report dozens of intermediate batches; clients only
/// need the recent ones.
const STATUS_OUTPUT_LIMIT: i64 = 5;

/// Request body for run creation.
#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub machine_id: DbId,
    pub workflow_version_id: DbId,
    pub inputs: Option<serde_json::Map<String, serde_json::Value>>,
    pub origin: Option<String>,
}

/// Response for run creation. `message` distinguishes a fresh run from
/// an existing in-flight one returned by the idempotency check.
#[derive(Debug, Serialize)]
pub struct CreateRunResponse {
    pub run_id: RunId,
    pub message: &'static str,
}

/// POST /api/v1/runs
///
/// Creates a run and starts delivering it to the target machine. The
/// response returns immediately; delivery continues in the background
/// and the caller polls the status endpoint for the outcome.
pub async fn create_run(
    State(state): State<AppState>,
    MaybeApiUser(caller): MaybeApiUser,
    Json(input): Json<CreateRunRequest>,
) -> AppResult<impl IntoResponse> {
    let origin = input.origin.unwrap_or_else(|| {
        if caller.is_some() {
            ORIGIN_API.to_string()
        } else {
            ORIGIN_MANUAL.to_string()
        }
    });

    let outcome = dispatch::create_run(
        &state.pool,
        state.storage.as_ref(),
        &state.config.urls,
        Arc::clone(&state.machine_client),
        &state.config.public_origin,
        &state.background,
        CreateRunParams {
            machine_id: input.machine_id,
            workflow_version_id: input.workflow_version_id,
            inputs: input.inputs,
            origin,
            caller,
        },
    )
    .await?;

    Ok(Json(CreateRunResponse {
        run_id: outcome.run_id,
        message: if outcome.created {
            "Workflow run created"
        } else {
            "Existing workflow run found"
        },
    }))
}

/// GET /api/v1/runs/{run_id}/status
///
/// Read-only polling view: status (including the synthetic `queued`),
/// timestamps, duration, sanitized outputs, images with resolved URLs,
/// and a progress estimate.
pub async fn get_status(
    State(state): State<AppState>,
    Path(run_id): Path<RunId>,
) -> AppResult<impl IntoResponse> {
    let run = RunRepo::find_by_id(&state.pool, run_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Run" }))?;

    let status = RunStatus::from_name(&run.status)
        .map_err(|_| AppError::InternalError(format!("run {run_id} has corrupt status")))?;

    let outputs = RunOutputRepo::list_by_run(&state.pool, run_id, STATUS_OUTPUT_LIMIT).await?;
    let payloads: Vec<(serde_json::Value, Timestamp)> = outputs
        .into_iter()
        .map(|output| (output.data, output.created_at))
        .collect();

    let report = build_status_report(
        run_id,
        status,
        run.inputs.as_ref(),
        run.started_at,
        run.ended_at,
        &payloads,
        &state.config.urls,
    );

    Ok(Json(report))
}
