//! Inline-image scrubbing for historical run data.
//!
//! After a run reaches a terminal state its stored payloads only need
//! to answer "what was produced and where does it live" -- the inline
//! base64 blobs that rode along are dead weight. The cleanup paths use
//! this module to narrow output payloads to image metadata and to
//! replace inline data URIs in stored input mappings.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Image-entry fields preserved by [`strip_image_entry`]. Everything
/// else (inline payloads, per-node debug data) is dropped.
const KEPT_IMAGE_FIELDS: &[&str] = &["filename", "url", "thumbnail_url", "width", "height", "type"];

/// Matches a canonical URL embedded inside an inline data blob, e.g.
/// appended by an uploader as `...url=https://cdn.example.com/x.png`.
static EMBEDDED_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url=(https?://[^'"&]+)"#).expect("valid regex"));

/// Whether a string holds an inline base64 image payload.
pub fn is_inline_image(value: &str) -> bool {
    value.starts_with("data:image/") || value.starts_with("data:application/octet-stream;base64")
}

/// Reduce an image entry to its metadata fields.
pub fn strip_image_entry(image: &Value) -> Value {
    let Value::Object(map) = image else {
        return image.clone();
    };
    let mut clean = serde_json::Map::new();
    for field in KEPT_IMAGE_FIELDS {
        if let Some(v) = map.get(*field) {
            clean.insert((*field).to_string(), v.clone());
        }
    }
    Value::Object(clean)
}

/// Strip inline image payloads from an output payload.
///
/// Returns `Some((narrowed, image_count))` when the payload holds an
/// `images` array, where `image_count` is the number of entries seen.
/// Returns `None` when there is nothing to strip -- callers use that to
/// skip the database write entirely.
pub fn strip_output_images(data: &Value) -> Option<(Value, usize)> {
    let images = data.get("images")?.as_array()?;
    let count = images.len();

    let stripped: Vec<Value> = images.iter().map(strip_image_entry).collect();
    if Value::Array(stripped.clone()) == data["images"] {
        // Already narrowed by an earlier pass.
        return None;
    }

    let mut narrowed = data.clone();
    narrowed["images"] = Value::Array(stripped);
    Some((narrowed, count))
}

/// Replacement for an inline image blob with no recoverable URL. Keeps
/// the MIME prefix so operators can tell what was there.
fn placeholder_for(blob: &str) -> String {
    let prefix = blob.split(';').next().unwrap_or("data:unknown");
    format!("[image data removed - original format: {prefix}]")
}

/// Scrub a single string value, if it is an inline image.
fn scrub_string(value: &str) -> Option<String> {
    if !is_inline_image(value) {
        return None;
    }
    match EMBEDDED_URL_RE.captures(value) {
        Some(caps) => Some(caps[1].to_string()),
        None => Some(placeholder_for(value)),
    }
}

/// Recursively scrub inline image payloads from a JSON value.
///
/// Returns `Some(scrubbed)` when anything changed, `None` otherwise.
/// Recurses through objects and arrays at any depth; inline blobs are
/// replaced by an embedded canonical URL when one is discoverable, or
/// by a placeholder recording the original MIME prefix.
pub fn scrub_value(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => scrub_string(s).map(Value::String),
        Value::Array(items) => {
            let mut changed = false;
            let scrubbed: Vec<Value> = items
                .iter()
                .map(|item| match scrub_value(item) {
                    Some(new) => {
                        changed = true;
                        new
                    }
                    None => item.clone(),
                })
                .collect();
            changed.then_some(Value::Array(scrubbed))
        }
        Value::Object(map) => {
            let mut changed = false;
            let mut scrubbed = map.clone();
            for (key, item) in map {
                if let Some(new) = scrub_value(item) {
                    scrubbed.insert(key.clone(), new);
                    changed = true;
                }
            }
            changed.then_some(Value::Object(scrubbed))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inline_image_detection() {
        assert!(is_inline_image("data:image/png;base64,iVBOR"));
        assert!(is_inline_image("data:application/octet-stream;base64,AAAA"));
        assert!(!is_inline_image("https://cdn.example.com/a.png"));
        assert!(!is_inline_image("data:text/plain;base64,aGk="));
    }

    #[test]
    fn strip_keeps_metadata_only() {
        let image = json!({
            "filename": "a.png",
            "url": "https://cdn.example.com/a.png",
            "thumbnail_url": "https://cdn.example.com/t/a.png",
            "width": 1024,
            "height": 768,
            "type": "output",
            "data": "iVBORw0KGgo",
            "node_meta": { "huge": "blob" }
        });
        let clean = strip_image_entry(&image);
        assert_eq!(
            clean,
            json!({
                "filename": "a.png",
                "url": "https://cdn.example.com/a.png",
                "thumbnail_url": "https://cdn.example.com/t/a.png",
                "width": 1024,
                "height": 768,
                "type": "output"
            })
        );
    }

    #[test]
    fn strip_output_images_counts_and_narrows() {
        let data = json!({
            "images": [
                { "filename": "a.png", "data": "blob1" },
                { "filename": "b.png", "data": "blob2" }
            ],
            "error": null
        });
        let (narrowed, count) = strip_output_images(&data).unwrap();
        assert_eq!(count, 2);
        assert!(narrowed["images"][0].get("data").is_none());
        assert_eq!(narrowed["images"][1]["filename"], "b.png");
    }

    #[test]
    fn strip_output_images_idempotent() {
        let data = json!({
            "images": [{ "filename": "a.png", "data": "blob" }]
        });
        let (narrowed, _) = strip_output_images(&data).unwrap();
        // A second pass over already-narrowed data is a no-op.
        assert!(strip_output_images(&narrowed).is_none());
    }

    #[test]
    fn strip_output_images_none_without_images() {
        assert!(strip_output_images(&json!({ "error": "boom" })).is_none());
        assert!(strip_output_images(&json!("not an object")).is_none());
    }

    #[test]
    fn scrub_extracts_embedded_url() {
        let value = json!("data:image/png;base64,AAAA&url=https://cdn.example.com/up/x.png");
        assert_eq!(
            scrub_value(&value).unwrap(),
            json!("https://cdn.example.com/up/x.png")
        );
    }

    #[test]
    fn scrub_replaces_with_placeholder() {
        let value = json!("data:image/jpeg;base64,/9j/4AAQSkZJRg");
        assert_eq!(
            scrub_value(&value).unwrap(),
            json!("[image data removed - original format: data:image/jpeg]")
        );
    }

    #[test]
    fn scrub_recurses_through_nesting() {
        let value = json!({
            "prompt": "a cat",
            "reference": {
                "frames": [
                    "data:image/png;base64,AAAA",
                    "https://cdn.example.com/kept.png"
                ]
            }
        });
        let scrubbed = scrub_value(&value).unwrap();
        assert_eq!(scrubbed["prompt"], "a cat");
        assert_eq!(
            scrubbed["reference"]["frames"][0],
            "[image data removed - original format: data:image/png]"
        );
        assert_eq!(
            scrubbed["reference"]["frames"][1],
            "https://cdn.example.com/kept.png"
        );
    }

    #[test]
    fn scrub_reports_no_change_for_clean_input() {
        let value = json!({ "prompt": "a cat", "steps": 20 });
        assert!(scrub_value(&value).is_none());
    }

    #[test]
    fn scrub_is_idempotent() {
        let value = json!({ "img": "data:image/png;base64,AAAA" });
        let once = scrub_value(&value).unwrap();
        assert!(scrub_value(&once).is_none());
    }
}
