//! Run output model.

use runbridge_core::types::{DbId, RunId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// One reported result batch for a run. Rows are append-only; cleanup
/// narrows `data` in place but never deletes the row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RunOutput {
    pub id: DbId,
    pub run_id: RunId,
    pub data: serde_json::Value,
    pub created_at: Timestamp,
}
