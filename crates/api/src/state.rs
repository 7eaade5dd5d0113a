use std::sync::Arc;

use runbridge_cloud::ObjectStorage;
use runbridge_machines::MachineClient;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: runbridge_db::DbPool,
    /// Server configuration (includes the storage URL config handed to
    /// the status/update/cleanup paths).
    pub config: Arc<ServerConfig>,
    /// Object storage client.
    pub storage: Arc<dyn ObjectStorage>,
    /// Shared HTTP client for machine dispatch.
    pub machine_client: Arc<MachineClient>,
    /// Cancels detached background work (delivery, deferred cleanup)
    /// during graceful shutdown.
    pub background: CancellationToken,
}
