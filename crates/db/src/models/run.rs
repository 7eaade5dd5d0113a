//! Run models and DTOs.

use runbridge_core::types::{DbId, RunId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A run row from `workflow_runs`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub workflow_id: DbId,
    pub workflow_version_id: DbId,
    pub machine_id: DbId,
    pub status: String,
    pub inputs: Option<serde_json::Value>,
    pub origin: String,
    pub dedup_key: String,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Input for inserting a new run row.
#[derive(Debug, Clone)]
pub struct CreateRun {
    pub id: RunId,
    pub workflow_id: DbId,
    pub workflow_version_id: DbId,
    pub machine_id: DbId,
    pub inputs: Option<serde_json::Value>,
    pub origin: String,
    pub dedup_key: String,
}

/// Outcome of an idempotent run insert.
#[derive(Debug, Clone)]
pub enum RunCreation {
    /// A new row was inserted.
    Created(WorkflowRun),
    /// A non-terminal run with the same dedup key already existed; its
    /// row is returned and no new dispatch should be attempted.
    Existing(WorkflowRun),
}

impl RunCreation {
    /// The run row, whichever way it was obtained.
    pub fn run(&self) -> &WorkflowRun {
        match self {
            Self::Created(run) | Self::Existing(run) => run,
        }
    }
}
