//! Dedup-key derivation for idempotent run creation.
//!
//! Two creation requests describe the same logical work when they name
//! the same workflow version, the same machine, semantically equal
//! inputs, and the same origin. The key is a SHA-256 over a canonical
//! rendering of that tuple; a partial unique index over non-terminal
//! runs turns the insert into an atomic insert-if-absent.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::types::DbId;

/// Derive the dedup key for a creation request.
///
/// Inputs are canonicalized (object keys sorted recursively) so two
/// requests with the same mapping in different key order produce the
/// same key. `None` and an empty mapping are distinct on purpose: an
/// explicit empty mapping is still a statement about inputs.
pub fn dedup_key(
    workflow_version_id: DbId,
    machine_id: DbId,
    inputs: Option<&Value>,
    origin: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(workflow_version_id.to_le_bytes());
    hasher.update(machine_id.to_le_bytes());
    match inputs {
        Some(value) => {
            hasher.update([1u8]);
            hasher.update(canonical_json(value));
        }
        None => hasher.update([0u8]),
    }
    hasher.update(origin.as_bytes());

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Render a JSON value with object keys sorted recursively.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        serde_json::to_string(k).expect("string serializes"),
                        canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", rendered.join(","))
        }
        other => serde_json::to_string(other).expect("scalar serializes"),
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
    fn key_is_stable_across_key_order() {
        let a = json!({ "prompt": "cat", "steps": 20 });
        let b: Value = serde_json::from_str(r#"{ "steps": 20, "prompt": "cat" }"#).unwrap();
        assert_eq!(
            dedup_key(1, 2, Some(&a), "api"),
            dedup_key(1, 2, Some(&b), "api")
        );
    }

    #[test]
    fn different_origin_changes_key() {
        let inputs = json!({ "prompt": "cat" });
        assert_ne!(
            dedup_key(1, 2, Some(&inputs), "api"),
            dedup_key(1, 2, Some(&inputs), "manual")
        );
    }

    #[test]
    fn different_machine_changes_key() {
        let inputs = json!({ "prompt": "cat" });
        assert_ne!(
            dedup_key(1, 2, Some(&inputs), "api"),
            dedup_key(1, 3, Some(&inputs), "api")
        );
    }

    #[test]
    fn none_and_empty_inputs_differ() {
        assert_ne!(
            dedup_key(1, 2, None, "api"),
            dedup_key(1, 2, Some(&json!({})), "api")
        );
    }

    #[test]
    fn nested_objects_canonicalized() {
        let a = json!({ "outer": { "b": 1, "a": 2 } });
        let b: Value = serde_json::from_str(r#"{ "outer": { "a": 2, "b": 1 } }"#).unwrap();
        assert_eq!(
            dedup_key(1, 2, Some(&a), "api"),
            dedup_key(1, 2, Some(&b), "api")
        );
    }

    #[test]
    fn key_looks_like_sha256_hex() {
        let key = dedup_key(1, 2, None, "api");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
