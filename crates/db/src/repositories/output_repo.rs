//! Repository for the `workflow_run_outputs` table.

use runbridge_core::types::{DbId, RunId};
use sqlx::PgPool;

use crate::models::output::RunOutput;

/// Column list for `workflow_run_outputs` queries.
const COLUMNS: &str = "id, run_id, data, created_at";

/// Provides query operations for run output records. Outputs are
/// append-only; cleanup narrows `data` but never deletes rows.
pub struct RunOutputRepo;

impl RunOutputRepo {
    /// Insert an output record for a run.
    pub async fn insert(
        pool: &PgPool,
        run_id: RunId,
        data: &serde_json::Value,
    ) -> Result<RunOutput, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_run_outputs (run_id, data) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunOutput>(&query)
            .bind(run_id)
            .bind(data)
            .fetch_one(pool)
            .await
    }

    /// List a run's outputs, oldest first, bounded by `limit`. The
    /// status path caps this to keep responses small.
    pub async fn list_by_run(
        pool: &PgPool,
        run_id: RunId,
        limit: i64,
    ) -> Result<Vec<RunOutput>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_run_outputs \
             WHERE run_id = $1 \
             ORDER BY created_at ASC, id ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, RunOutput>(&query)
            .bind(run_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// List every output for a run. Cleanup walks all of them.
    pub async fn list_all_by_run(
        pool: &PgPool,
        run_id: RunId,
    ) -> Result<Vec<RunOutput>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_run_outputs \
             WHERE run_id = $1 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, RunOutput>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }

    /// Replace an output's payload with a narrowed copy.
    pub async fn update_data(
        pool: &PgPool,
        id: DbId,
        data: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflow_run_outputs SET data = $2 WHERE id = $1")
            .bind(id)
            .bind(data)
            .execute(pool)
            .await?;
        Ok(())
    }
}
