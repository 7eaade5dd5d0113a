//! S3-compatible object storage provider.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;

use crate::provider::{ObjectStorage, StorageError, StoredObject};

/// Connection settings for an S3-compatible endpoint.
///
/// Built once at startup from server configuration and handed to
/// [`S3Storage::new`]; nothing in this crate reads the environment.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// API endpoint, e.g. `https://nyc3.digitaloceanspaces.com`.
    pub endpoint: String,
    /// Region name; S3-compatible providers commonly accept `auto`.
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Use path-style requests (`endpoint/bucket/key`) instead of
    /// virtual-host addressing. Required by some compatible providers.
    pub force_path_style: bool,
}

/// Object storage backed by an S3-compatible bucket.
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Storage {
    /// Build a client for the configured endpoint and bucket.
    pub fn new(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "runbridge",
        );
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.clone())
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::Request(format!("put {key}: {e}")))?;

        tracing::debug!(key, "Stored object");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Request(format!("delete {key}: {e}")))?;

        tracing::debug!(key, "Deleted object");
        Ok(())
    }

    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
    ) -> Result<Vec<StoredObject>, StorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| StorageError::Request(format!("list {prefix}: {e}")))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                let last_modified = object.last_modified().and_then(|dt| {
                    chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
                });
                Some(StoredObject {
                    key,
                    last_modified,
                    size: object.size(),
                })
            })
            .collect();

        Ok(objects)
    }
}
