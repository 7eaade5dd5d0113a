//! Deferred single-run cleanup.
//!
//! After a run reaches a terminal state, a client (or the machine
//! itself) posts the cleanup trigger; this task waits out the delay
//! and then strips inline image payloads from the run's outputs and
//! scrubs data URIs from its stored input mapping. Failures are logged
//! and swallowed -- cleanup never propagates to any caller.

use std::time::Duration;

use runbridge_core::scrub::{scrub_value, strip_output_images};
use runbridge_core::types::RunId;
use runbridge_db::repositories::{RunOutputRepo, RunRepo};
use runbridge_db::DbPool;
use tokio_util::sync::CancellationToken;

/// Default delay before scrubbing, giving clients time to fetch the
/// full payload once.
pub const DEFAULT_DELAY_SECS: u64 = 60;

/// Wait out `delay`, then scrub the run's stored data.
pub async fn run(pool: DbPool, run_id: RunId, delay: Duration, cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::warn!(run_id = %run_id, "Deferred cleanup cancelled by shutdown");
            return;
        }
        _ = tokio::time::sleep(delay) => {}
    }

    match scrub_run(&pool, run_id).await {
        Ok((outputs_updated, images_stripped, inputs_scrubbed)) => {
            tracing::info!(
                run_id = %run_id,
                outputs_updated,
                images_stripped,
                inputs_scrubbed,
                "Deferred cleanup finished"
            );
        }
        Err(e) => {
            tracing::error!(run_id = %run_id, error = %e, "Deferred cleanup failed");
        }
    }
}

/// Strip output images and scrub input data URIs for one run.
///
/// Returns `(outputs updated, images stripped, inputs scrubbed)`.
async fn scrub_run(pool: &DbPool, run_id: RunId) -> Result<(usize, usize, bool), sqlx::Error> {
    let mut outputs_updated = 0;
    let mut images_stripped = 0;

    for output in RunOutputRepo::list_all_by_run(pool, run_id).await? {
        if let Some((narrowed, count)) = strip_output_images(&output.data) {
            RunOutputRepo::update_data(pool, output.id, &narrowed).await?;
            outputs_updated += 1;
            images_stripped += count;
        }
    }

    let mut inputs_scrubbed = false;
    if let Some(run) = RunRepo::find_by_id(pool, run_id).await? {
        if let Some(inputs) = &run.inputs {
            if let Some(scrubbed) = scrub_value(inputs) {
                RunRepo::update_inputs(pool, run_id, &scrubbed).await?;
                inputs_scrubbed = true;
            }
        }
    } else {
        tracing::warn!(run_id = %run_id, "Run vanished before deferred cleanup");
    }

    Ok((outputs_updated, images_stripped, inputs_scrubbed))
}
