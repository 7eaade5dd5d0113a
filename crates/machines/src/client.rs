//! HTTP delivery to machine endpoints.
//!
//! [`MachineClient`] wraps a pooled [`reqwest::Client`] and knows the
//! request shape for each machine type:
//!
//! - `serverless`: `POST {endpoint}/run` with an `{"input": {...}}`
//!   envelope;
//! - `token-serverless`: same, plus a bearer auth token (not required
//!   for local endpoints);
//! - `classic`: `POST {endpoint}/runbridge/run` with the bare payload;
//!   failure bodies are parsed for per-node error detail.
//!
//! Attempts run under the caller-supplied [`RetryPolicy`]; each attempt
//! gets its own timeout. A timed-out attempt's request may still land
//! on the far end -- there is no cross-attempt cancellation.

use runbridge_core::machine::{is_local_endpoint, MachineType};
use runbridge_core::retry::{DeliveryFailure, RetryPolicy, TimeoutDisposition};
use runbridge_core::types::RunId;
use runbridge_db::models::machine::Machine;
use serde::{Deserialize, Serialize};

/// Payload delivered to a machine for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunPayload {
    pub run_id: RunId,
    /// The workflow-API document with caller inputs injected.
    pub workflow_api: serde_json::Value,
    /// Where the machine posts status transitions and outputs.
    pub status_endpoint: String,
    /// Where the machine uploads ad hoc files.
    pub file_upload_endpoint: String,
}

/// Structured failure detail a classic machine may return.
#[derive(Debug, Deserialize)]
struct ClassicErrorBody {
    node_errors: Option<serde_json::Value>,
}

/// How a successful dispatch concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The machine acknowledged the run.
    Delivered,
    /// The attempt timed out under a policy that assumes serverless
    /// platforms accept work without acknowledging in time. The run's
    /// status must be left untouched; the machine's callback reconciles.
    AssumedAccepted,
}

/// HTTP client for machine endpoints. Cheap to share behind an `Arc`;
/// the inner reqwest client pools connections across machines.
pub struct MachineClient {
    http: reqwest::Client,
}

impl Default for MachineClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineClient {
    pub fn new() -> Self {
        // Per-attempt timeouts come from the retry policy, so the
        // underlying client carries none of its own.
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Deliver a run to a machine under `policy`.
    ///
    /// Returns the terminal failure once the policy declines further
    /// attempts. Backoff sleeps happen between attempts only.
    pub async fn dispatch(
        &self,
        machine: &Machine,
        machine_type: MachineType,
        payload: &RunPayload,
        policy: &RetryPolicy,
    ) -> Result<DeliveryOutcome, DeliveryFailure> {
        let mut attempt = 1u32;
        loop {
            let result = tokio::time::timeout(
                policy.per_attempt_timeout,
                self.send_attempt(machine, machine_type, payload),
            )
            .await;

            let failure = match result {
                Ok(Ok(())) => return Ok(DeliveryOutcome::Delivered),
                Ok(Err(failure)) => failure,
                Err(_elapsed) => DeliveryFailure::Timeout,
            };

            if failure == DeliveryFailure::Timeout
                && policy.on_timeout == TimeoutDisposition::AssumeAccepted
            {
                tracing::warn!(
                    run_id = %payload.run_id,
                    machine_id = machine.id,
                    "Dispatch attempt timed out; assuming the machine accepted the run"
                );
                return Ok(DeliveryOutcome::AssumedAccepted);
            }

            if !policy.should_retry(&failure, attempt) {
                return Err(failure);
            }

            tracing::warn!(
                run_id = %payload.run_id,
                machine_id = machine.id,
                attempt,
                error = ?failure,
                "Dispatch attempt failed, retrying"
            );
            tokio::time::sleep(policy.delay_before(attempt + 1)).await;
            attempt += 1;
        }
    }

    /// One delivery attempt, without timeout handling.
    async fn send_attempt(
        &self,
        machine: &Machine,
        machine_type: MachineType,
        payload: &RunPayload,
    ) -> Result<(), DeliveryFailure> {
        let request = match machine_type {
            MachineType::Serverless => self
                .http
                .post(format!("{}/run", machine.endpoint))
                .json(&serde_json::json!({ "input": payload })),
            MachineType::TokenServerless => {
                let mut request = self
                    .http
                    .post(format!("{}/run", machine.endpoint))
                    .json(&serde_json::json!({ "input": payload }));
                if let Some(token) = &machine.auth_token {
                    request = request.bearer_auth(token);
                } else if !is_local_endpoint(&machine.endpoint) {
                    // Checked upstream; kept as a guard for direct callers.
                    return Err(DeliveryFailure::Connect(
                        "machine auth token not configured".to_string(),
                    ));
                }
                request
            }
            MachineType::Classic => self
                .http
                .post(format!("{}/runbridge/run", machine.endpoint))
                .json(payload),
        };

        let response = request.send().await.map_err(classify_request_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let body = match machine_type {
            // Classic machines return structured per-node errors worth
            // surfacing over the raw body.
            MachineType::Classic => match serde_json::from_str::<ClassicErrorBody>(&body) {
                Ok(ClassicErrorBody {
                    node_errors: Some(node_errors),
                }) => format!("node_errors: {node_errors}"),
                _ => body,
            },
            _ => body,
        };

        Err(DeliveryFailure::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Classify a reqwest error into a [`DeliveryFailure`].
fn classify_request_error(err: reqwest::Error) -> DeliveryFailure {
    if err.is_timeout() {
        DeliveryFailure::Timeout
    } else {
        // Connect, DNS, and TLS failures all mean the endpoint was
        // never reached.
        DeliveryFailure::Connect(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_callback_endpoints() {
        let payload = RunPayload {
            run_id: uuid::Uuid::nil(),
            workflow_api: serde_json::json!({}),
            status_endpoint: "https://bridge.example.com/api/v1/runs/update".into(),
            file_upload_endpoint: "https://bridge.example.com/api/v1/files/upload".into(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value["status_endpoint"],
            "https://bridge.example.com/api/v1/runs/update"
        );
        assert!(value.get("workflow_api").is_some());
        assert!(value.get("run_id").is_some());
    }

    #[test]
    fn classic_error_body_parses_node_errors() {
        let body: ClassicErrorBody =
            serde_json::from_str(r#"{ "node_errors": { "3": "missing model" } }"#).unwrap();
        assert!(body.node_errors.is_some());

        let empty: ClassicErrorBody = serde_json::from_str("{}").unwrap();
        assert!(empty.node_errors.is_none());
    }
}
