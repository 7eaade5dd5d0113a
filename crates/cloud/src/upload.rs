//! Data-URI uploads.
//!
//! Image-typed run inputs and the ad hoc upload endpoint both arrive
//! as `data:` URIs. The payload is decoded, stored under
//! `uploads/{uuid}.{ext}`, and replaced by its public URL.

use base64::Engine;
use runbridge_core::urls::StorageUrlConfig;

use crate::provider::{ObjectStorage, StorageError};

/// A parsed `data:` URI payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub extension: &'static str,
}

/// Map a MIME type to the upload content type and file extension.
/// Unrecognized image types fall back to PNG, matching what machines
/// emit when the format is unknown.
fn extension_for(mime: &str) -> (&'static str, &'static str) {
    match mime {
        "image/jpeg" | "image/jpg" => ("image/jpeg", "jpg"),
        "image/webp" => ("image/webp", "webp"),
        _ => ("image/png", "png"),
    }
}

/// Parse and decode a `data:` URI.
///
/// Accepts the canonical `data:{mime};base64,{payload}` form and, as a
/// fallback, any string with a `;base64,` separator (some clients omit
/// or mangle the MIME prefix).
pub fn parse_data_uri(data_uri: &str) -> Result<DecodedImage, StorageError> {
    let (mime, payload) = match data_uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
    {
        Some((mime, payload)) => (mime, payload),
        None => {
            let payload = data_uri
                .rsplit_once(";base64,")
                .map(|(_, p)| p)
                .ok_or_else(|| {
                    StorageError::InvalidPayload("not a base64 data URI".to_string())
                })?;
            ("image/png", payload)
        }
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| StorageError::InvalidPayload(format!("base64 decode failed: {e}")))?;

    let (content_type, extension) = extension_for(mime);
    Ok(DecodedImage {
        bytes,
        content_type: content_type.to_string(),
        extension,
    })
}

/// Upload a `data:` URI payload and return its public URL.
pub async fn upload_data_uri(
    storage: &dyn ObjectStorage,
    urls: &StorageUrlConfig,
    data_uri: &str,
) -> Result<String, StorageError> {
    let decoded = parse_data_uri(data_uri)?;
    let key = StorageUrlConfig::upload_key(uuid::Uuid::new_v4(), decoded.extension);

    storage
        .put_object(&key, decoded.bytes, &decoded.content_type)
        .await?;

    Ok(urls.public_url(&key))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
