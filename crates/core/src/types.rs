/// Database primary keys for machines, workflows, versions, and outputs
/// are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Run identifiers are opaque, generator-produced UUIDs. They appear in
/// storage object keys and public URLs, so they are never sequential.
pub type RunId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identity attached to an API credential, used for the workflow
/// ownership check during run creation. Verification of the credential
/// itself happens at the HTTP layer; this carries only the claims.
#[derive(Debug, Clone)]
pub struct ApiCaller {
    pub user_id: String,
    pub org_id: Option<String>,
}
