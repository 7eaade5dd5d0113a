//! Repository for `workflow_versions`.

use runbridge_core::types::DbId;
use sqlx::PgPool;

use crate::models::workflow::WorkflowVersionWithOwner;

/// Provides query operations for workflow versions.
pub struct WorkflowVersionRepo;

impl WorkflowVersionRepo {
    /// Find a workflow version together with its workflow's owner
    /// columns, as one read. The dispatcher needs both to run the
    /// ownership check before touching anything else.
    pub async fn find_with_owner(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowVersionWithOwner>, sqlx::Error> {
        sqlx::query_as::<_, WorkflowVersionWithOwner>(
            "SELECT v.id, v.workflow_id, v.version, v.workflow_api, v.created_at, \
                    w.user_id AS owner_user_id, w.org_id AS owner_org_id \
             FROM workflow_versions v \
             JOIN workflows w ON w.id = v.workflow_id \
             WHERE v.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
