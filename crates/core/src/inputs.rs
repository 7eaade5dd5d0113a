//! External input injection into stored workflow-API documents.
//!
//! A workflow version stores its workflow-API document as JSON: a map of
//! node id -> `{ "class_type": ..., "inputs": { ... } }`. Nodes whose
//! class is one of the external-input kinds declare a binding under
//! `inputs.input_id`; run creation matches caller-supplied values to
//! those bindings and writes each value into the field the kind reads
//! from at execution time.

use serde_json::Value;

/// Field every external-input node reads its bound name from.
pub const INPUT_ID_FIELD: &str = "input_id";

/// External input kinds declared inside a workflow-API document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    NumberSlider,
    Lora,
    Checkpoint,
    Boolean,
}

impl InputKind {
    /// Match a node `class_type` to an input kind, if it is one.
    pub fn from_class_type(class_type: &str) -> Option<Self> {
        match class_type {
            "ExternalText" => Some(Self::Text),
            "ExternalNumberSlider" => Some(Self::NumberSlider),
            "ExternalLora" => Some(Self::Lora),
            "ExternalCheckpoint" => Some(Self::Checkpoint),
            "ExternalBoolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// The node field this kind reads its value from.
    pub fn target_field(self) -> &'static str {
        // Every current kind reads `default_value`; kept per-kind so a
        // future kind with a different target slots in here.
        "default_value"
    }

    /// Coerce a caller-supplied value into what the kind expects.
    ///
    /// Booleans arrive as strings from form posts and API calls; they
    /// are compared case-insensitively against `"true"`. Other kinds
    /// take the value as given.
    pub fn coerce(self, value: &Value) -> Value {
        match self {
            Self::Boolean => {
                let truthy = match value {
                    Value::String(s) => s.eq_ignore_ascii_case("true"),
                    Value::Bool(b) => *b,
                    _ => false,
                };
                Value::Bool(truthy)
            }
            _ => value.clone(),
        }
    }
}

/// Inject caller-supplied values into a workflow-API document in place.
///
/// For each `(name, value)` pair, every node whose `inputs.input_id`
/// equals `name` and whose class is a known external-input kind gets
/// `value` (coerced per kind) written into the kind's target field.
/// Names with no matching declaration are ignored. Returns the number
/// of fields written.
pub fn apply_inputs(workflow_api: &mut Value, inputs: &serde_json::Map<String, Value>) -> usize {
    let Some(nodes) = workflow_api.as_object_mut() else {
        return 0;
    };

    let mut written = 0;
    for node in nodes.values_mut() {
        let Some(class_type) = node.get("class_type").and_then(Value::as_str) else {
            continue;
        };
        let Some(kind) = InputKind::from_class_type(class_type) else {
            continue;
        };
        let Some(node_inputs) = node.get_mut("inputs").and_then(Value::as_object_mut) else {
            continue;
        };
        let Some(bound_name) = node_inputs.get(INPUT_ID_FIELD).and_then(Value::as_str) else {
            continue;
        };
        if let Some(value) = inputs.get(bound_name) {
            let coerced = kind.coerce(value);
            node_inputs.insert(kind.target_field().to_string(), coerced);
            written += 1;
        }
    }
    written
}

/// Count the external inputs a workflow-API document declares.
pub fn declared_input_count(workflow_api: &Value) -> usize {
    let Some(nodes) = workflow_api.as_object() else {
        return 0;
    };
    nodes
        .values()
        .filter(|node| {
            node.get("class_type")
                .and_then(Value::as_str)
                .and_then(InputKind::from_class_type)
                .is_some()
                && node
                    .get("inputs")
                    .and_then(|i| i.get(INPUT_ID_FIELD))
                    .is_some()
        })
        .count()
}

/// Whether a string value is an inline data URI that should be uploaded
/// to object storage (and replaced by its URL) before dispatch.
pub fn is_data_uri(value: &str) -> bool {
    value.starts_with("data:")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
