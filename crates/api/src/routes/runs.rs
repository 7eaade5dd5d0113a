//! Route definitions for the run lifecycle.
//!
//! ```text
//! POST   /                     create_run
//! GET    /{run_id}/status      get_status
//! POST   /update               update_run (machine callback)
//! POST   /cleanup              cleanup_run (deferred trigger)
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{cleanup, runs, update};
use crate::state::AppState;

/// Routes nested under `/runs`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(runs::create_run))
        .route("/{run_id}/status", get(runs::get_status))
        .route("/update", post(update::update_run))
        .route("/cleanup", post(cleanup::cleanup_run))
}
