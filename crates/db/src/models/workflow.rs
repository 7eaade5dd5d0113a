//! Workflow version models.
//!
//! Workflow rows themselves are only touched through the owner join
//! below; runs reference them by id.

use runbridge_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// An immutable workflow version snapshot joined with its workflow's
/// owner columns, as the dispatcher needs both in one read. The owner
/// columns (`user_id`, `org_id` on the workflow) drive the cross-tenant
/// authorization check; `workflow_api` is the stored document with the
/// declared external inputs.
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowVersionWithOwner {
    pub id: DbId,
    pub workflow_id: DbId,
    pub version: i32,
    pub workflow_api: serde_json::Value,
    pub created_at: Timestamp,
    pub owner_user_id: Option<String>,
    pub owner_org_id: Option<String>,
}
