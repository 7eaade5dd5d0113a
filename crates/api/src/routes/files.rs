//! Route definitions for file access.
//!
//! ```text
//! GET    /view      view_file (redirect)
//! POST   /upload    upload_file
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::files;
use crate::state::AppState;

/// Routes nested under `/files`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/view", get(files::view_file))
        .route("/upload", post(files::upload_file))
}
