//! Machine delivery client and run dispatcher.
//!
//! [`client`] knows how to talk to each machine endpoint variant and
//! drives delivery attempts under a [`runbridge_core::retry::RetryPolicy`].
//! [`dispatch`] is the run creation flow: resolve references, authorize,
//! rewrite inputs, insert the run row, and hand delivery to a detached
//! background task.

pub mod client;
pub mod dispatch;

pub use client::{DeliveryOutcome, MachineClient};
pub use dispatch::{create_run, CreateRunOutcome, CreateRunParams, DispatchError};
