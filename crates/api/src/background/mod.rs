//! Background tasks.
//!
//! Each submodule provides an async function intended to be spawned via
//! `tokio::spawn`. All tasks accept a [`CancellationToken`] and are
//! best-effort: graceful shutdown cancels them, and any work they miss
//! is covered by the batch cleanup worker.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod run_cleanup;
