//! Lifecycle-level tests composing the pure building blocks the way
//! the handlers do: dispatch failure accounting, the callback write
//! path feeding the status read path, and cleanup idempotence.

use chrono::TimeZone;
use runbridge_core::machine::MachineType;
use runbridge_core::report::build_status_report;
use runbridge_core::retry::{DeliveryFailure, RetryPolicy};
use runbridge_core::sanitize::{rewrite_image_urls, sanitize_output};
use runbridge_core::scrub::{scrub_value, strip_output_images};
use runbridge_core::status::RunStatus;
use runbridge_core::types::Timestamp;
use runbridge_core::urls::{StorageAddressing, StorageUrlConfig};
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

// A classic machine at an unreachable endpoint: the connect failure is
// terminal on the first attempt, the run goes failed, and the status
// query reports a duration from the recorded timestamps.
#[test]
fn unreachable_classic_machine_fails_with_duration() {
    let policy = RetryPolicy::for_machine_type(MachineType::Classic);
    let failure = DeliveryFailure::Connect("connection refused".into());
    assert!(!policy.should_retry(&failure, 1));

    // The dispatcher records failed + ended_at; the reporter derives
    // the duration.
    let report = build_status_report(
        uuid::Uuid::nil(),
        RunStatus::Failed,
        None,
        Some(ts(1000)),
        Some(ts(1012)),
        &[],
        &urls(),
    );
    assert_eq!(report.status, "failed");
    assert_eq!(report.duration, Some(12.0));
    assert_eq!(report.progress.current, 0);
}

// An output payload posted with inline base64: after the write-path
// sanitize/rewrite and the read-path report, the binary field is gone
// and the image URL follows the storage convention.
#[test]
fn output_payload_round_trip_drops_binary_and_derives_url() {
    let run_id = uuid::Uuid::new_v4();

    // Write path (update receiver).
    let reported = json!({
        "images": [{ "filename": "a.png", "data": "iVBORw0KGgoAAAANSUhEUg" }]
    });
    let mut stored = sanitize_output(&reported);
    rewrite_image_urls(&mut stored, &urls(), run_id, true);

    assert!(stored["images"][0].get("data").is_none());

    // Read path (status reporter) over the stored payload.
    let report = build_status_report(
        run_id,
        RunStatus::Success,
        None,
        Some(ts(0)),
        Some(ts(30)),
        &[(stored, ts(20))],
        &urls(),
    );

    let image = &report.images[0];
    assert_eq!(image["filename"], "a.png");
    assert!(image.get("data").is_none());
    assert!(image["url"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/outputs/runs/{run_id}/a.png")));
}

// Monotonic callback sequence: every transition a machine normally
// reports is accepted; regressions after the terminal state are not.
#[test]
fn callback_status_sequence_is_guarded() {
    let sequence = [
        RunStatus::NotStarted,
        RunStatus::Running,
        RunStatus::Uploading,
        RunStatus::Success,
    ];
    for pair in sequence.windows(2) {
        assert!(pair[0].can_transition(pair[1]), "{} -> {}", pair[0], pair[1]);
    }
    assert!(!RunStatus::Success.can_transition(RunStatus::Running));
    assert!(!RunStatus::Failed.can_transition(RunStatus::Success));
}

// Cleanup idempotence: one pass strips everything strippable, a second
// pass over the results detects nothing to do.
#[test]
fn cleanup_passes_converge_after_one_round() {
    let output = json!({
        "images": [
            { "filename": "a.png", "data": "blob", "width": 512 },
            { "filename": "b.png", "base64": "blob" }
        ]
    });
    let inputs = json!({
        "prompt": "a cat",
        "init_image": "data:image/png;base64,AAAA"
    });

    let (stripped, count) = strip_output_images(&output).unwrap();
    assert_eq!(count, 2);
    let scrubbed = scrub_value(&inputs).unwrap();

    assert!(strip_output_images(&stripped).is_none());
    assert!(scrub_value(&scrubbed).is_none());
}
