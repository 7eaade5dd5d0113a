//! Handlers for file viewing and ad hoc uploads.
//!
//! Routes:
//! - `GET  /api/v1/files/view?file={path}` — redirect to the public URL
//! - `POST /api/v1/files/upload`           — upload a data-URI image

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use runbridge_cloud::upload;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Query parameters for the view redirect.
#[derive(Debug, Deserialize)]
pub struct ViewParams {
    pub file: Option<String>,
}

/// GET /api/v1/files/view
///
/// Redirects to the object's public URL under the configured CDN.
pub async fn view_file(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> AppResult<Redirect> {
    let file = params
        .file
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::BadRequest("file query parameter is required".to_string()))?;

    Ok(Redirect::temporary(&state.config.urls.public_url(&file)))
}

/// Request body for an ad hoc upload.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// A `data:` URI carrying the image payload.
    pub data: String,
}

/// Response body for an ad hoc upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /api/v1/files/upload
///
/// Decodes a data-URI image, stores it under `uploads/`, and returns
/// its public URL.
pub async fn upload_file(
    State(state): State<AppState>,
    Json(input): Json<UploadRequest>,
) -> AppResult<impl IntoResponse> {
    let url =
        upload::upload_data_uri(state.storage.as_ref(), &state.config.urls, &input.data).await?;
    Ok(Json(UploadResponse { url }))
}
