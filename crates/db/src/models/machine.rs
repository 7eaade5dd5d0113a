//! Machine entity model.

use runbridge_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// An external compute endpoint registered with the platform.
///
/// `auth_token` never leaves the service; it is only read during
/// dispatch to token-authenticated machines.
#[derive(Debug, Clone, FromRow)]
pub struct Machine {
    pub id: DbId,
    pub name: String,
    pub endpoint: String,
    pub machine_type: String,
    pub auth_token: Option<String>,
    pub disabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
