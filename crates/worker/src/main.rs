//! Batch cleanup entrypoint.
//!
//! ```text
//! runbridge-worker --days 30 --limit 500 [--dry-run] [--delete-storage] [--log-file PATH]
//! ```
//!
//! Scrubs inline image payloads from outputs of terminal runs older
//! than the retention window, one bounded page per invocation. With
//! `--delete-storage` the corresponding bucket objects are deleted too
//! (irreversible; pair with `--dry-run` first). Intended to run from a
//! scheduler (cron, systemd timer).

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use runbridge_cloud::{S3Config, S3Storage};
use runbridge_worker::cleanup::{
    cleanup_database_images, cutoff_for_days, purge_stored_objects, BatchCleanupOptions,
    DEFAULT_PAGE_LIMIT, DEFAULT_RETENTION_DAYS,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "runbridge-worker", about = "Scrub historical run data")]
struct Cli {
    /// Scrub runs older than this many days.
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
    days: i64,

    /// Maximum runs processed per invocation.
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
    limit: i64,

    /// Detect and report without writing or deleting anything.
    #[arg(long)]
    dry_run: bool,

    /// Also delete run output objects from the bucket. Irreversible.
    #[arg(long)]
    delete_storage: bool,

    /// Append logs to this file in addition to stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.log_file.as_deref())?;

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = runbridge_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;

    let cutoff = cutoff_for_days(chrono::Utc::now(), cli.days);
    tracing::info!(
        days = cli.days,
        %cutoff,
        limit = cli.limit,
        dry_run = cli.dry_run,
        delete_storage = cli.delete_storage,
        "Starting batch cleanup"
    );

    let options = BatchCleanupOptions {
        cutoff,
        limit: cli.limit,
        dry_run: cli.dry_run,
    };
    let summary = cleanup_database_images(&pool, &options)
        .await
        .context("Database cleanup pass failed")?;

    if cli.delete_storage {
        let storage = S3Storage::new(&s3_config_from_env()?);
        let purge = purge_stored_objects(&storage, cutoff, cli.limit, cli.dry_run)
            .await
            .context("Storage purge pass failed")?;
        tracing::info!(
            examined = purge.objects_examined,
            deleted = purge.objects_deleted,
            "Storage purge complete"
        );
    }

    tracing::info!(
        runs = summary.runs_processed,
        images_found = summary.images_found,
        outputs_updated = summary.outputs_updated,
        "Batch cleanup complete"
    );
    Ok(())
}

/// Initialize tracing to stderr, optionally teeing to a log file.
fn init_tracing(log_file: Option<&std::path::Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {parent:?}"))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {path:?}"))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runbridge_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Storage settings from environment variables, required only for
/// `--delete-storage`.
fn s3_config_from_env() -> anyhow::Result<S3Config> {
    Ok(S3Config {
        endpoint: std::env::var("STORAGE_ENDPOINT").context("STORAGE_ENDPOINT must be set")?,
        region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".into()),
        access_key: std::env::var("STORAGE_ACCESS_KEY")
            .context("STORAGE_ACCESS_KEY must be set")?,
        secret_key: std::env::var("STORAGE_SECRET_KEY")
            .context("STORAGE_SECRET_KEY must be set")?,
        bucket: std::env::var("STORAGE_BUCKET").context("STORAGE_BUCKET must be set")?,
        force_path_style: std::env::var("STORAGE_ADDRESSING")
            .map(|mode| mode == "path-style")
            .unwrap_or(true),
    })
}
