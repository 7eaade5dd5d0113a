//! Shared response envelope types for API handlers.
//!
//! Endpoints whose shape is not part of the machine-facing contract use
//! a `{ "data": ... }` envelope. The run status, update, and cleanup
//! endpoints return their documented shapes directly.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
