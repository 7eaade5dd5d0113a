//! Domain logic for the runbridge platform.
//!
//! Everything in this crate is pure: run status transitions, output
//! sanitization, inline-image scrubbing, workflow input injection, the
//! dispatch retry policy, dedup-key derivation, storage URL derivation,
//! and client-facing status report assembly. No database, network, or
//! environment access -- callers pass explicit configuration in.

pub mod dedup;
pub mod error;
pub mod inputs;
pub mod machine;
pub mod report;
pub mod retry;
pub mod sanitize;
pub mod scrub;
pub mod status;
pub mod types;
pub mod urls;
