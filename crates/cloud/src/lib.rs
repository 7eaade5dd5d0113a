//! Object storage for the runbridge platform.
//!
//! [`ObjectStorage`] abstracts the bucket operations the platform
//! needs (put, delete, list); [`S3Storage`] implements it against any
//! S3-compatible endpoint via the AWS SDK. [`upload`] holds the
//! data-URI upload path used for image-typed run inputs and ad hoc
//! uploads.

pub mod provider;
pub mod s3;
pub mod upload;

pub use provider::{ObjectStorage, StorageError, StoredObject};
pub use s3::{S3Config, S3Storage};
