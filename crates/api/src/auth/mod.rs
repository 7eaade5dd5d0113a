//! API-token authentication.
//!
//! Credential *issuance* lives outside this service; we only validate
//! bearer tokens enough to attach an [`ApiCaller`] identity to run
//! creation, which drives the workflow ownership check.

pub mod token;

pub use token::MaybeApiUser;
