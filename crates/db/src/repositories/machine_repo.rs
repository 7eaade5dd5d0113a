//! Repository for the `machines` table.

use runbridge_core::types::DbId;
use sqlx::PgPool;

use crate::models::machine::Machine;

/// Column list for `machines` queries.
const COLUMNS: &str = "\
    id, name, endpoint, machine_type, auth_token, disabled, \
    created_at, updated_at";

/// Provides query operations for registered machines.
pub struct MachineRepo;

impl MachineRepo {
    /// Find a machine by ID, excluding disabled rows. Run creation only
    /// sees machines that are currently eligible for dispatch.
    pub async fn find_enabled_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Machine>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM machines WHERE id = $1 AND disabled = FALSE");
        sqlx::query_as::<_, Machine>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
