//! Client-facing run status reports.
//!
//! [`build_status_report`] reconstructs the polling view of a run from
//! the persisted row and its output payloads. It never mutates state;
//! URL gaps are filled on the fly and a synthetic `queued` status is
//! derived when an upstream admission controller has stamped a queue
//! position into the input mapping (no component in this system writes
//! one -- it is an external collaborator contract).

use serde::Serialize;
use serde_json::Value;

use crate::sanitize::{rewrite_image_urls, sanitize_output};
use crate::status::RunStatus;
use crate::types::{RunId, Timestamp};
use crate::urls::StorageUrlConfig;

/// Input-mapping member an external admission controller may stamp.
pub const QUEUE_POSITION_KEY: &str = "queue_position";

/// Rough seconds-per-slot used for the queue wait estimate.
const ESTIMATED_SECS_PER_SLOT: i64 = 30;

/// Progress block of a status report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Progress {
    pub current: u8,
    pub total: u8,
    pub message: String,
}

/// Queue block of a status report, present only for queued runs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueueInfo {
    pub position: i64,
    /// Estimated seconds until execution starts.
    pub estimated_time: i64,
}

/// The full polling view of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusReport {
    pub id: RunId,
    pub status: String,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
    /// Wall-clock seconds between start and end, when both are set.
    pub duration: Option<f64>,
    /// Sanitized output payloads, oldest first, each with `created_at`.
    pub outputs: Vec<Value>,
    /// Image entries with resolved URLs.
    pub images: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_info: Option<QueueInfo>,
}

/// Extract a queue position from a run's input mapping, if present.
fn queue_position(inputs: Option<&Value>) -> Option<i64> {
    inputs?.get(QUEUE_POSITION_KEY)?.as_i64()
}

/// Build the status report for a run.
///
/// `outputs` are `(payload, created_at)` pairs ordered oldest first.
pub fn build_status_report(
    run_id: RunId,
    status: RunStatus,
    inputs: Option<&Value>,
    started_at: Option<Timestamp>,
    ended_at: Option<Timestamp>,
    outputs: &[(Value, Timestamp)],
    urls: &StorageUrlConfig,
) -> RunStatusReport {
    let duration = match (started_at, ended_at) {
        (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
        _ => None,
    };

    // Sanitize each payload and fill URL gaps before anything is
    // returned to the client.
    let mut sanitized: Vec<Value> = Vec::with_capacity(outputs.len());
    for (payload, created_at) in outputs {
        let mut clean = sanitize_output(payload);
        rewrite_image_urls(&mut clean, urls, run_id, false);
        if let Some(obj) = clean.as_object_mut() {
            obj.insert(
                "created_at".into(),
                serde_json::to_value(created_at).expect("timestamp serializes"),
            );
        }
        sanitized.push(clean);
    }

    // The image list comes from the first output that reported any.
    let images: Vec<Value> = sanitized
        .iter()
        .find_map(|payload| payload.get("images").and_then(Value::as_array).cloned())
        .unwrap_or_default();

    // Failed runs surface the most recent output's error field.
    let error = if status == RunStatus::Failed {
        sanitized
            .last()
            .and_then(|payload| payload.get("error"))
            .and_then(Value::as_str)
            .map(String::from)
    } else {
        None
    };

    // Synthetic queued status: stored as not-started, but an admission
    // controller has stamped a position.
    let queued_position = match status {
        RunStatus::NotStarted => queue_position(inputs),
        _ => None,
    };

    let (status_name, progress, queue_info) = match queued_position {
        Some(position) => (
            "queued".to_string(),
            Progress {
                current: 0,
                total: 100,
                message: "Waiting in queue".to_string(),
            },
            Some(QueueInfo {
                position,
                estimated_time: position.max(0) * ESTIMATED_SECS_PER_SLOT,
            }),
        ),
        None => (
            status.name().to_string(),
            Progress {
                current: status.progress_percent(),
                total: 100,
                message: status.progress_message().to_string(),
            },
            None,
        ),
    };

    RunStatusReport {
        id: run_id,
        status: status_name,
        started_at,
        ended_at,
        duration,
        outputs: sanitized,
        images,
        error,
        progress,
        queue_info,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::urls::StorageAddressing;
    use chrono::TimeZone;
    use serde_json::json;

    fn urls() -> StorageUrlConfig {
        StorageUrlConfig {
            endpoint: "https://nyc3.example-objects.com".into(),
            cdn_endpoint: "https://cdn.example.com".into(),
            bucket: "runbridge".into(),
            addressing: StorageAddressing::OmitBucket,
        }
    }

    fn ts(secs: i64) -> Timestamp {
        chrono::Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn running_report_has_midway_progress() {
        let report = build_status_report(
            uuid::Uuid::nil(),
            RunStatus::Running,
            None,
            Some(ts(100)),
            None,
            &[],
            &urls(),
        );
        assert_eq!(report.status, "running");
        assert_eq!(report.progress.current, 50);
        assert_eq!(report.progress.message, "Generating image");
        assert!(report.duration.is_none());
        assert!(report.queue_info.is_none());
    }

    #[test]
    fn duration_computed_from_timestamps() {
        let report = build_status_report(
            uuid::Uuid::nil(),
            RunStatus::Failed,
            None,
            Some(ts(100)),
            Some(ts(163)),
            &[],
            &urls(),
        );
        assert_eq!(report.duration, Some(63.0));
        assert_eq!(report.progress.current, 0);
    }

    #[test]
    fn image_urls_resolved_and_binary_absent() {
        let run_id = uuid::Uuid::nil();
        let payload = json!({
            "images": [{ "filename": "a.png", "data": "iVBORw0KGgo" }]
        });
        let report = build_status_report(
            run_id,
            RunStatus::Success,
            None,
            Some(ts(0)),
            Some(ts(10)),
            &[(payload, ts(5))],
            &urls(),
        );

        assert_eq!(report.images.len(), 1);
        let image = &report.images[0];
        assert_eq!(image["filename"], "a.png");
        assert!(image.get("data").is_none());
        assert!(image["url"]
            .as_str()
            .unwrap()
            .ends_with(&format!("/outputs/runs/{run_id}/a.png")));
    }

    #[test]
    fn images_come_from_first_output_reporting_any() {
        let report = build_status_report(
            uuid::Uuid::nil(),
            RunStatus::Success,
            None,
            None,
            None,
            &[
                (json!({ "logs": [] }), ts(1)),
                (json!({ "images": [{ "filename": "a.png" }] }), ts(2)),
                (json!({ "images": [{ "filename": "b.png" }] }), ts(3)),
            ],
            &urls(),
        );
        assert_eq!(report.images.len(), 1);
        assert_eq!(report.images[0]["filename"], "a.png");
    }

    #[test]
    fn failed_run_surfaces_latest_output_error() {
        let report = build_status_report(
            uuid::Uuid::nil(),
            RunStatus::Failed,
            None,
            None,
            None,
            &[
                (json!({ "error": "first" }), ts(1)),
                (json!({ "error": "sampler exploded" }), ts(2)),
            ],
            &urls(),
        );
        assert_eq!(report.error.as_deref(), Some("sampler exploded"));
    }

    #[test]
    fn successful_run_has_no_error_field() {
        let report = build_status_report(
            uuid::Uuid::nil(),
            RunStatus::Success,
            None,
            None,
            None,
            &[(json!({ "error": "stale" }), ts(1))],
            &urls(),
        );
        assert!(report.error.is_none());
    }

    #[test]
    fn queued_derived_from_queue_position_marker() {
        let inputs = json!({ "prompt": "cat", "queue_position": 4 });
        let report = build_status_report(
            uuid::Uuid::nil(),
            RunStatus::NotStarted,
            Some(&inputs),
            None,
            None,
            &[],
            &urls(),
        );
        assert_eq!(report.status, "queued");
        let queue_info = report.queue_info.unwrap();
        assert_eq!(queue_info.position, 4);
        assert_eq!(queue_info.estimated_time, 120);
    }

    #[test]
    fn queue_marker_ignored_once_running() {
        let inputs = json!({ "queue_position": 4 });
        let report = build_status_report(
            uuid::Uuid::nil(),
            RunStatus::Running,
            Some(&inputs),
            None,
            None,
            &[],
            &urls(),
        );
        assert_eq!(report.status, "running");
        assert!(report.queue_info.is_none());
    }

    #[test]
    fn outputs_carry_created_at() {
        let report = build_status_report(
            uuid::Uuid::nil(),
            RunStatus::Success,
            None,
            None,
            None,
            &[(json!({ "images": [] }), ts(42))],
            &urls(),
        );
        assert!(report.outputs[0].get("created_at").is_some());
    }
}
