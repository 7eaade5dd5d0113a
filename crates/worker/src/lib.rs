//! Batch cleanup of historical run data.
//!
//! Out-of-band counterpart to the API's deferred single-run cleanup:
//! pages through terminal runs older than a cutoff, strips inline image
//! payloads from their outputs, and (opt-in) deletes the corresponding
//! objects from the bucket.

pub mod cleanup;
