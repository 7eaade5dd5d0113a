//! Output payload sanitization.
//!
//! Machines report output payloads that can embed entire images as
//! base64 alongside the metadata we actually want to keep. Everything
//! persisted or returned to clients passes through [`sanitize_output`]
//! first so large binary fields never reach the database or the wire.

use serde_json::Value;

use crate::types::RunId;
use crate::urls::StorageUrlConfig;

/// Image-entry fields that carry inline binary payloads.
const BINARY_IMAGE_FIELDS: &[&str] = &["data", "raw_data", "base64", "mask"];

/// Serialized seed metadata larger than this is reduced to the bare seed.
const MAX_SEED_INFO_BYTES: usize = 1000;

/// Error strings longer than this are truncated.
const MAX_ERROR_CHARS: usize = 5000;

/// At most this many log lines are kept per payload.
const MAX_LOG_LINES: usize = 10;

/// Sanitize an output payload, returning a narrowed copy.
///
/// - image entries lose their inline binary fields (`data`, `raw_data`,
///   `base64`, `mask`);
/// - oversized `seed_info` blobs are reduced to `{ "seed": ... }` or
///   dropped when unparseable;
/// - `error` strings are truncated to a bounded length;
/// - `logs` arrays are capped with a truncation marker.
///
/// Arrays are sanitized element-wise; non-object values pass through.
pub fn sanitize_output(payload: &Value) -> Value {
    match payload {
        Value::Array(items) => Value::Array(items.iter().map(sanitize_output).collect()),
        Value::Object(map) => {
            let mut result = map.clone();

            if let Some(Value::Array(images)) = result.get("images") {
                let cleaned: Vec<Value> = images.iter().map(sanitize_image).collect();
                result.insert("images".into(), Value::Array(cleaned));
            }

            if let Some(Value::String(error)) = result.get("error") {
                if error.chars().count() > MAX_ERROR_CHARS {
                    let truncated: String = error.chars().take(MAX_ERROR_CHARS).collect();
                    result.insert(
                        "error".into(),
                        Value::String(format!("{truncated}... [error truncated]")),
                    );
                }
            }

            if let Some(Value::Array(logs)) = result.get("logs") {
                if logs.len() > MAX_LOG_LINES {
                    let dropped = logs.len() - MAX_LOG_LINES;
                    let mut capped: Vec<Value> = logs[..MAX_LOG_LINES].to_vec();
                    capped.push(serde_json::json!({
                        "message": format!("... [{dropped} log entries truncated]")
                    }));
                    result.insert("logs".into(), Value::Array(capped));
                }
            }

            Value::Object(result)
        }
        other => other.clone(),
    }
}

/// Sanitize a single image entry.
fn sanitize_image(image: &Value) -> Value {
    let Value::Object(map) = image else {
        return image.clone();
    };
    let mut clean = map.clone();
    for field in BINARY_IMAGE_FIELDS {
        clean.remove(*field);
    }

    if let Some(Value::String(seed_info)) = clean.get("seed_info") {
        if seed_info.len() > MAX_SEED_INFO_BYTES {
            match serde_json::from_str::<Value>(seed_info) {
                Ok(parsed) => match parsed.get("seed") {
                    Some(seed) => {
                        clean.insert("seed_info".into(), serde_json::json!({ "seed": seed }));
                    }
                    None => {
                        clean.remove("seed_info");
                    }
                },
                Err(_) => {
                    clean.remove("seed_info");
                }
            }
        }
    }

    Value::Object(clean)
}

/// Rewrite image/file/animation URLs in an output payload in place.
///
/// Every entry under `images`, `files`, and `gifs` gets a `url` derived
/// from the run id and its filename; image entries additionally get a
/// `thumbnail_url` when a thumbnail was reported. Entries that already
/// carry a URL are left alone on the read path, but the write path
/// (update receiver) always overwrites so stored URLs follow the
/// current storage configuration.
pub fn rewrite_image_urls(
    payload: &mut Value,
    urls: &StorageUrlConfig,
    run_id: RunId,
    overwrite: bool,
) {
    for list_field in ["images", "files", "gifs"] {
        let Some(Value::Array(entries)) = payload.get_mut(list_field) else {
            continue;
        };
        for entry in entries {
            let Some(obj) = entry.as_object_mut() else {
                continue;
            };
            let Some(filename) = obj.get("filename").and_then(Value::as_str) else {
                continue;
            };
            let filename = filename.to_string();

            if overwrite || !obj.contains_key("url") {
                obj.insert(
                    "url".into(),
                    Value::String(urls.output_url(run_id, &filename)),
                );
            }

            // On the write path a thumbnail URL is only derived when the
            // machine reported one; the read path fills any gap.
            let thumbnail_reported =
                obj.contains_key("thumbnail") || obj.contains_key("thumbnail_url");
            let wants_thumbnail = if overwrite { thumbnail_reported } else { true };
            if list_field == "images"
                && wants_thumbnail
                && (overwrite || !obj.contains_key("thumbnail_url"))
            {
                obj.insert(
                    "thumbnail_url".into(),
                    Value::String(urls.thumbnail_url(run_id, &filename)),
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::urls::{StorageAddressing, StorageUrlConfig};
    use serde_json::json;

    fn urls() -> StorageUrlConfig {
        StorageUrlConfig {
            endpoint: "https://nyc3.example-objects.com".into(),
            cdn_endpoint: "https://cdn.example.com".into(),
            bucket: "runbridge".into(),
            addressing: StorageAddressing::OmitBucket,
        }
    }

    #[test]
    fn strips_binary_image_fields() {
        let payload = json!({
            "images": [{
                "filename": "a.png",
                "data": "iVBORw0KGgo...",
                "raw_data": [1, 2, 3],
                "base64": "abc",
                "mask": "xyz",
                "width": 512,
                "height": 512,
                "type": "output"
            }]
        });

        let clean = sanitize_output(&payload);
        let image = &clean["images"][0];
        assert!(image.get("data").is_none());
        assert!(image.get("raw_data").is_none());
        assert!(image.get("base64").is_none());
        assert!(image.get("mask").is_none());
        assert_eq!(image["filename"], "a.png");
        assert_eq!(image["width"], 512);
        assert_eq!(image["height"], 512);
        assert_eq!(image["type"], "output");
    }

    #[test]
    fn oversized_seed_info_reduced_to_seed() {
        let big = format!(
            r#"{{"seed": 1234, "noise": "{}"}}"#,
            "x".repeat(MAX_SEED_INFO_BYTES)
        );
        let payload = json!({ "images": [{ "filename": "a.png", "seed_info": big }] });

        let clean = sanitize_output(&payload);
        assert_eq!(clean["images"][0]["seed_info"], json!({ "seed": 1234 }));
    }

    #[test]
    fn unparseable_oversized_seed_info_dropped() {
        let payload = json!({
            "images": [{ "filename": "a.png", "seed_info": "%".repeat(2000) }]
        });
        let clean = sanitize_output(&payload);
        assert!(clean["images"][0].get("seed_info").is_none());
    }

    #[test]
    fn small_seed_info_kept_verbatim() {
        let payload = json!({
            "images": [{ "filename": "a.png", "seed_info": r#"{"seed": 9}"# }]
        });
        let clean = sanitize_output(&payload);
        assert_eq!(clean["images"][0]["seed_info"], r#"{"seed": 9}"#);
    }

    #[test]
    fn long_error_truncated() {
        let payload = json!({ "error": "e".repeat(6000) });
        let clean = sanitize_output(&payload);
        let error = clean["error"].as_str().unwrap();
        assert!(error.len() < 6000);
        assert!(error.ends_with("... [error truncated]"));
    }

    #[test]
    fn short_error_untouched() {
        let payload = json!({ "error": "CUDA out of memory" });
        let clean = sanitize_output(&payload);
        assert_eq!(clean["error"], "CUDA out of memory");
    }

    #[test]
    fn logs_capped_with_marker() {
        let logs: Vec<Value> = (0..25).map(|i| json!({ "message": format!("line {i}") })).collect();
        let payload = json!({ "logs": logs });

        let clean = sanitize_output(&payload);
        let capped = clean["logs"].as_array().unwrap();
        assert_eq!(capped.len(), MAX_LOG_LINES + 1);
        assert_eq!(
            capped[MAX_LOG_LINES]["message"],
            "... [15 log entries truncated]"
        );
    }

    #[test]
    fn arrays_sanitized_elementwise() {
        let payload = json!([
            { "images": [{ "filename": "a.png", "data": "blob" }] },
            { "images": [{ "filename": "b.png", "data": "blob" }] }
        ]);
        let clean = sanitize_output(&payload);
        assert!(clean[0]["images"][0].get("data").is_none());
        assert!(clean[1]["images"][0].get("data").is_none());
    }

    #[test]
    fn rewrite_always_overwrites_on_write_path() {
        let run_id = uuid::Uuid::nil();
        let mut payload = json!({
            "images": [{ "filename": "a.png", "url": "http://stale.example/a.png", "thumbnail": true }]
        });
        rewrite_image_urls(&mut payload, &urls(), run_id, true);

        let image = &payload["images"][0];
        assert_eq!(
            image["url"],
            format!("https://cdn.example.com/outputs/runs/{run_id}/a.png")
        );
        assert_eq!(
            image["thumbnail_url"],
            format!("https://cdn.example.com/outputs/runs/{run_id}/thumbnails/a.png")
        );
    }

    #[test]
    fn rewrite_fills_missing_urls_on_read_path() {
        let run_id = uuid::Uuid::nil();
        let mut payload = json!({
            "images": [{ "filename": "a.png" }],
            "gifs": [{ "filename": "loop.webp" }]
        });
        rewrite_image_urls(&mut payload, &urls(), run_id, false);

        assert_eq!(
            payload["images"][0]["url"],
            format!("https://cdn.example.com/outputs/runs/{run_id}/a.png")
        );
        assert_eq!(
            payload["gifs"][0]["url"],
            format!("https://cdn.example.com/outputs/runs/{run_id}/loop.webp")
        );
    }

    #[test]
    fn rewrite_keeps_existing_url_on_read_path() {
        let run_id = uuid::Uuid::nil();
        let mut payload = json!({
            "images": [{ "filename": "a.png", "url": "https://elsewhere.example/a.png" }]
        });
        rewrite_image_urls(&mut payload, &urls(), run_id, false);
        assert_eq!(payload["images"][0]["url"], "https://elsewhere.example/a.png");
    }
}
