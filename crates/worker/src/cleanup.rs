//! Batch scrubbing passes.
//!
//! The database pass narrows output payloads exactly like the deferred
//! cleanup does, but over a bounded page of old terminal runs per
//! invocation -- invoke repeatedly (or on a schedule) to drain a
//! backlog. Dry-run mode performs every read and detection step but
//! skips writes and deletes.

use runbridge_cloud::{ObjectStorage, StorageError};
use runbridge_core::scrub::strip_output_images;
use runbridge_core::types::Timestamp;
use runbridge_core::urls::StorageUrlConfig;
use runbridge_db::repositories::{RunOutputRepo, RunRepo};
use runbridge_db::DbPool;

/// Options for one batch cleanup invocation.
#[derive(Debug, Clone)]
pub struct BatchCleanupOptions {
    /// Runs created before this instant are eligible.
    pub cutoff: Timestamp,
    /// Maximum runs processed this invocation.
    pub limit: i64,
    /// Detect and report, but write nothing.
    pub dry_run: bool,
}

/// Counters from the database pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchCleanupSummary {
    /// Terminal runs examined.
    pub runs_processed: usize,
    /// Output rows that held strippable image payloads.
    pub images_found: usize,
    /// Output rows actually rewritten (zero in dry-run mode).
    pub outputs_updated: usize,
}

/// Counters from the storage pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoragePurgeSummary {
    /// Objects listed under the outputs prefix.
    pub objects_examined: usize,
    /// Objects older than the cutoff (deleted unless dry-run).
    pub objects_deleted: usize,
}

/// Cutoff timestamp for "older than `days` days".
pub fn cutoff_for_days(now: Timestamp, days: i64) -> Timestamp {
    now - chrono::Duration::days(days)
}

/// Strip image payloads from outputs of old terminal runs.
///
/// Idempotent: a second invocation over the same window finds nothing
/// left to strip and performs zero writes.
pub async fn cleanup_database_images(
    pool: &DbPool,
    options: &BatchCleanupOptions,
) -> Result<BatchCleanupSummary, sqlx::Error> {
    let runs = RunRepo::list_terminal_older_than(pool, options.cutoff, options.limit).await?;
    tracing::info!(
        count = runs.len(),
        cutoff = %options.cutoff,
        limit = options.limit,
        dry_run = options.dry_run,
        "Scanning old terminal runs"
    );

    let mut summary = BatchCleanupSummary::default();

    for run in &runs {
        summary.runs_processed += 1;

        for output in RunOutputRepo::list_all_by_run(pool, run.id).await? {
            let Some((narrowed, image_count)) = strip_output_images(&output.data) else {
                continue;
            };
            summary.images_found += image_count;

            if options.dry_run {
                tracing::info!(
                    run_id = %run.id,
                    output_id = output.id,
                    images = image_count,
                    "Dry run: would strip image payloads"
                );
                continue;
            }

            RunOutputRepo::update_data(pool, output.id, &narrowed).await?;
            summary.outputs_updated += 1;
            tracing::info!(
                run_id = %run.id,
                output_id = output.id,
                images = image_count,
                "Stripped image payloads"
            );
        }
    }

    tracing::info!(
        runs = summary.runs_processed,
        images_found = summary.images_found,
        outputs_updated = summary.outputs_updated,
        "Database cleanup pass finished"
    );
    Ok(summary)
}

/// Delete old run output objects from the bucket.
///
/// Destructive and irreversible; only runs when explicitly requested.
/// Objects are selected by their last-modified time against the same
/// cutoff as the database pass.
pub async fn purge_stored_objects(
    storage: &dyn ObjectStorage,
    cutoff: Timestamp,
    limit: i64,
    dry_run: bool,
) -> Result<StoragePurgeSummary, StorageError> {
    let objects = storage
        .list_objects(StorageUrlConfig::OUTPUTS_PREFIX, limit.min(i32::MAX as i64) as i32)
        .await?;

    let mut summary = StoragePurgeSummary {
        objects_examined: objects.len(),
        objects_deleted: 0,
    };

    if objects.is_empty() {
        tracing::info!("No stored objects found under the outputs prefix");
        return Ok(summary);
    }

    for object in objects {
        let Some(last_modified) = object.last_modified else {
            continue;
        };
        if last_modified >= cutoff {
            continue;
        }

        if dry_run {
            tracing::info!(key = %object.key, %last_modified, "Dry run: would delete object");
        } else {
            storage.delete_object(&object.key).await?;
            tracing::info!(key = %object.key, %last_modified, "Deleted object");
        }
        summary.objects_deleted += 1;
    }

    tracing::info!(
        examined = summary.objects_examined,
        deleted = summary.objects_deleted,
        dry_run,
        "Storage purge pass finished"
    );
    Ok(summary)
}

/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Default page size per invocation.
pub const DEFAULT_PAGE_LIMIT: i64 = 500;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn cutoff_subtracts_whole_days() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        let cutoff = cutoff_for_days(now, 30);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap());
    }

    #[test]
    fn zero_days_means_now() {
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap();
        assert_eq!(cutoff_for_days(now, 0), now);
    }
}
