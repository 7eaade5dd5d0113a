//! Repository for the `workflow_runs` table.

use runbridge_core::status::RunStatus;
use runbridge_core::types::{RunId, Timestamp};
use sqlx::PgPool;

use crate::models::run::{CreateRun, RunCreation, WorkflowRun};

/// Column list for `workflow_runs` queries.
const COLUMNS: &str = "\
    id, workflow_id, workflow_version_id, machine_id, status, inputs, \
    origin, dedup_key, started_at, ended_at, created_at";

/// Partial unique index backing idempotent creation; only non-terminal
/// rows are covered, so the constraint name doubles as the signal that
/// an in-flight duplicate exists.
const DEDUP_CONSTRAINT: &str = "uq_workflow_runs_dedup_key";

/// SQL list of non-terminal statuses.
const NON_TERMINAL: &str = "('not-started', 'running', 'uploading')";

/// Provides query operations for run records.
pub struct RunRepo;

impl RunRepo {
    // ── Creation ─────────────────────────────────────────────────────

    /// Insert a run row, atomically deduplicating against in-flight
    /// runs with the same dedup key.
    ///
    /// A violation of the partial unique index means another run with
    /// this key is still non-terminal; that row is fetched and returned
    /// as [`RunCreation::Existing`] instead of an error. Any other
    /// database error propagates.
    pub async fn create(pool: &PgPool, input: &CreateRun) -> Result<RunCreation, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_runs \
                 (id, workflow_id, workflow_version_id, machine_id, inputs, origin, dedup_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, WorkflowRun>(&query)
            .bind(input.id)
            .bind(input.workflow_id)
            .bind(input.workflow_version_id)
            .bind(input.machine_id)
            .bind(&input.inputs)
            .bind(&input.origin)
            .bind(&input.dedup_key)
            .fetch_one(pool)
            .await;

        match inserted {
            Ok(run) => Ok(RunCreation::Created(run)),
            Err(err) => {
                if is_dedup_violation(&err) {
                    if let Some(existing) =
                        Self::find_active_by_dedup_key(pool, &input.dedup_key).await?
                    {
                        return Ok(RunCreation::Existing(existing));
                    }
                    // The duplicate reached a terminal state between the
                    // insert and the lookup; surface the original error
                    // and let the caller retry.
                }
                Err(err)
            }
        }
    }

    /// Find the non-terminal run holding a dedup key, if any.
    pub async fn find_active_by_dedup_key(
        pool: &PgPool,
        dedup_key: &str,
    ) -> Result<Option<WorkflowRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_runs \
             WHERE dedup_key = $1 AND status IN {NON_TERMINAL}"
        );
        sqlx::query_as::<_, WorkflowRun>(&query)
            .bind(dedup_key)
            .fetch_optional(pool)
            .await
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Find a run by ID.
    pub async fn find_by_id(pool: &PgPool, id: RunId) -> Result<Option<WorkflowRun>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_runs WHERE id = $1");
        sqlx::query_as::<_, WorkflowRun>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List terminal runs created before `cutoff`, oldest first,
    /// bounded by `limit`. Batch cleanup pages through these.
    pub async fn list_terminal_older_than(
        pool: &PgPool,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<WorkflowRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_runs \
             WHERE created_at < $1 AND status IN ('success', 'failed') \
             ORDER BY created_at ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, WorkflowRun>(&query)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    // ── Dispatch mutations ───────────────────────────────────────────

    /// Record that delivery to the machine succeeded.
    pub async fn mark_started(pool: &PgPool, id: RunId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflow_runs SET started_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record that dispatch exhausted its retries.
    pub async fn mark_failed(pool: &PgPool, id: RunId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflow_runs SET status = 'failed', ended_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    // ── Callback mutations ───────────────────────────────────────────

    /// Apply a machine-reported status. Terminal statuses stamp
    /// `ended_at`; non-terminal statuses clear it. Transition validity
    /// is the caller's responsibility ([`RunStatus::can_transition`]).
    pub async fn update_status(
        pool: &PgPool,
        id: RunId,
        status: RunStatus,
    ) -> Result<(), sqlx::Error> {
        let query = if status.is_terminal() {
            "UPDATE workflow_runs SET status = $2, ended_at = NOW() WHERE id = $1"
        } else {
            "UPDATE workflow_runs SET status = $2, ended_at = NULL WHERE id = $1"
        };
        sqlx::query(query)
            .bind(id)
            .bind(status.name())
            .execute(pool)
            .await?;
        Ok(())
    }

    // ── Cleanup mutations ────────────────────────────────────────────

    /// Replace a run's stored input mapping with a scrubbed copy.
    pub async fn update_inputs(
        pool: &PgPool,
        id: RunId,
        inputs: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflow_runs SET inputs = $2 WHERE id = $1")
            .bind(id)
            .bind(inputs)
            .execute(pool)
            .await?;
        Ok(())
    }
}

/// Whether a sqlx error is a violation of the dedup unique index.
fn is_dedup_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.constraint() == Some(DEDUP_CONSTRAINT)
    )
}
