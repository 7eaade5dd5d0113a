//! Route definitions.

pub mod files;
pub mod health;
pub mod runs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /runs                    create run (POST)
/// /runs/{run_id}/status    poll run status (GET)
/// /runs/update             machine callback (POST)
/// /runs/cleanup            deferred cleanup trigger (POST)
///
/// /files/view              redirect to public URL (GET)
/// /files/upload            ad hoc data-URI upload (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/runs", runs::router())
        .nest("/files", files::router())
}
