//! Storage object keys and public URL derivation.
//!
//! All object keys follow fixed conventions (`outputs/runs/{run_id}/...`
//! for generated images, `uploads/{uuid}.{ext}` for ad hoc uploads).
//! Public URLs depend on how the CDN fronts the bucket, which differs
//! per provider; the three addressing modes are mutually exclusive and
//! chosen once at startup. Handlers receive a [`StorageUrlConfig`]
//! explicitly -- nothing here reads the process environment.

use crate::error::CoreError;
use crate::types::RunId;

/// How the CDN addresses bucket contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageAddressing {
    /// The CDN endpoint fronts the bucket directly; the bucket name is
    /// dropped from public URLs (Cloudflare R2 style).
    OmitBucket,
    /// The bucket is a subdomain of the CDN host (DigitalOcean Spaces
    /// style virtual-host addressing).
    VirtualHost,
    /// The CDN endpoint replaces the storage endpoint and the bucket
    /// stays in the path.
    PathStyle,
}

impl StorageAddressing {
    /// Parse from a configuration value.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "omit-bucket" => Ok(Self::OmitBucket),
            "virtual-host" => Ok(Self::VirtualHost),
            "path-style" => Ok(Self::PathStyle),
            other => Err(CoreError::Validation(format!(
                "Unknown storage addressing mode '{other}'. Must be one of: omit-bucket, virtual-host, path-style"
            ))),
        }
    }

    /// Configuration name value.
    pub fn name(self) -> &'static str {
        match self {
            Self::OmitBucket => "omit-bucket",
            Self::VirtualHost => "virtual-host",
            Self::PathStyle => "path-style",
        }
    }
}

/// Object storage location and CDN configuration.
///
/// Constructed once at startup and passed to every component that
/// derives URLs, so derivation stays unit-testable without touching
/// process environment state.
#[derive(Debug, Clone)]
pub struct StorageUrlConfig {
    /// S3-compatible API endpoint, e.g. `https://nyc3.digitaloceanspaces.com`.
    pub endpoint: String,
    /// Public CDN endpoint, e.g. `https://cdn.example.com`.
    pub cdn_endpoint: String,
    /// Bucket name.
    pub bucket: String,
    /// How the CDN addresses bucket contents.
    pub addressing: StorageAddressing,
}

impl StorageUrlConfig {
    // ── Object keys ──────────────────────────────────────────────────

    /// Key for a generated output image.
    pub fn output_key(run_id: RunId, filename: &str) -> String {
        format!("outputs/runs/{run_id}/{filename}")
    }

    /// Key for a generated output thumbnail.
    pub fn thumbnail_key(run_id: RunId, filename: &str) -> String {
        format!("outputs/runs/{run_id}/thumbnails/{filename}")
    }

    /// Key for an ad hoc upload.
    pub fn upload_key(id: uuid::Uuid, extension: &str) -> String {
        format!("uploads/{id}.{extension}")
    }

    /// Prefix under which all run outputs live.
    pub const OUTPUTS_PREFIX: &'static str = "outputs/runs/";

    // ── Public URLs ──────────────────────────────────────────────────

    /// Public URL for an arbitrary object key.
    pub fn public_url(&self, key: &str) -> String {
        self.rewrite_to_cdn(&format!("{}/{}/{}", self.endpoint, self.bucket, key))
    }

    /// Public URL for a run output image.
    pub fn output_url(&self, run_id: RunId, filename: &str) -> String {
        self.public_url(&Self::output_key(run_id, filename))
    }

    /// Public URL for a run output thumbnail.
    pub fn thumbnail_url(&self, run_id: RunId, filename: &str) -> String {
        self.public_url(&Self::thumbnail_key(run_id, filename))
    }

    /// Rewrite a raw storage URL (`{endpoint}/{bucket}/{key}`) into its
    /// public CDN form according to the addressing mode.
    pub fn rewrite_to_cdn(&self, url: &str) -> String {
        let origin = format!("{}/{}", self.endpoint, self.bucket);
        match self.addressing {
            StorageAddressing::OmitBucket => url.replacen(&origin, &self.cdn_endpoint, 1),
            StorageAddressing::VirtualHost => {
                let (scheme, host) = split_scheme(&self.cdn_endpoint);
                url.replacen(&origin, &format!("{scheme}://{}.{host}", self.bucket), 1)
            }
            StorageAddressing::PathStyle => url.replacen(&self.endpoint, &self.cdn_endpoint, 1),
        }
    }
}

/// Split a URL into scheme and remainder. Defaults to `https` when no
/// scheme is present.
fn split_scheme(url: &str) -> (&str, &str) {
    match url.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("https", url),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(addressing: StorageAddressing) -> StorageUrlConfig {
        StorageUrlConfig {
            endpoint: "https://nyc3.example-objects.com".into(),
            cdn_endpoint: "https://cdn.example.com".into(),
            bucket: "runbridge".into(),
            addressing,
        }
    }

    #[test]
    fn addressing_from_name() {
        assert_eq!(
            StorageAddressing::from_name("omit-bucket").unwrap(),
            StorageAddressing::OmitBucket
        );
        assert_eq!(
            StorageAddressing::from_name("virtual-host").unwrap(),
            StorageAddressing::VirtualHost
        );
        assert_eq!(
            StorageAddressing::from_name("path-style").unwrap(),
            StorageAddressing::PathStyle
        );
        assert!(StorageAddressing::from_name("dual-stack").is_err());
    }

    #[test]
    fn output_and_thumbnail_keys() {
        let run_id = uuid::Uuid::nil();
        assert_eq!(
            StorageUrlConfig::output_key(run_id, "a.png"),
            format!("outputs/runs/{run_id}/a.png")
        );
        assert_eq!(
            StorageUrlConfig::thumbnail_key(run_id, "a.png"),
            format!("outputs/runs/{run_id}/thumbnails/a.png")
        );
    }

    #[test]
    fn upload_key_carries_extension() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            StorageUrlConfig::upload_key(id, "webp"),
            format!("uploads/{id}.webp")
        );
    }

    #[test]
    fn omit_bucket_url() {
        let run_id = uuid::Uuid::nil();
        let urls = config(StorageAddressing::OmitBucket);
        assert_eq!(
            urls.output_url(run_id, "a.png"),
            format!("https://cdn.example.com/outputs/runs/{run_id}/a.png")
        );
    }

    #[test]
    fn virtual_host_url() {
        let run_id = uuid::Uuid::nil();
        let urls = config(StorageAddressing::VirtualHost);
        assert_eq!(
            urls.output_url(run_id, "a.png"),
            format!("https://runbridge.cdn.example.com/outputs/runs/{run_id}/a.png")
        );
    }

    #[test]
    fn path_style_url_keeps_bucket() {
        let run_id = uuid::Uuid::nil();
        let urls = config(StorageAddressing::PathStyle);
        assert_eq!(
            urls.output_url(run_id, "a.png"),
            format!("https://cdn.example.com/runbridge/outputs/runs/{run_id}/a.png")
        );
    }

    #[test]
    fn public_url_for_plain_file_path() {
        let urls = config(StorageAddressing::OmitBucket);
        assert_eq!(
            urls.public_url("uploads/abc.png"),
            "https://cdn.example.com/uploads/abc.png"
        );
    }
}
