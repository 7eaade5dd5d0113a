//! Run creation and delivery.
//!
//! [`create_run`] is the write path for new runs: resolve the machine
//! and workflow version, authorize the caller, rewrite inputs (inline
//! images are uploaded to object storage first), insert the run row
//! idempotently, then hand delivery to a detached background task. The
//! caller gets the run id back immediately and polls the status
//! endpoint for the outcome.
//!
//! The delivery task is guarded by a [`CancellationToken`] and is
//! explicitly best-effort: if the process shuts down mid-flight the
//! task is cut short and the run stays `not-started` until a machine
//! callback or cleanup touches it.

use std::sync::Arc;

use runbridge_cloud::{upload, ObjectStorage, StorageError};
use runbridge_core::dedup::dedup_key;
use runbridge_core::error::CoreError;
use runbridge_core::inputs::{apply_inputs, is_data_uri};
use runbridge_core::machine::{is_local_endpoint, validate_origin, MachineType};
use runbridge_core::retry::RetryPolicy;
use runbridge_core::types::{DbId, RunId};
use runbridge_core::urls::StorageUrlConfig;
use runbridge_db::models::machine::Machine;
use runbridge_db::models::run::{CreateRun, RunCreation};
use runbridge_db::repositories::{MachineRepo, RunRepo, WorkflowVersionRepo};
use runbridge_db::DbPool;
use tokio_util::sync::CancellationToken;

use crate::client::{DeliveryOutcome, MachineClient, RunPayload};

/// Errors from the run creation flow.
///
/// The authorization failure deliberately reuses the not-found wording
/// so callers cannot probe for the existence of other tenants'
/// workflows.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Machine not found")]
    MachineNotFound,

    #[error("Workflow version not found")]
    WorkflowVersionNotFound,

    #[error("Workflow not found")]
    WorkflowNotFound,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Caller identity attached to an API credential, if any.
pub use runbridge_core::types::ApiCaller;

/// Input to [`create_run`].
#[derive(Debug, Clone)]
pub struct CreateRunParams {
    pub machine_id: DbId,
    pub workflow_version_id: DbId,
    pub inputs: Option<serde_json::Map<String, serde_json::Value>>,
    pub origin: String,
    /// Present when the request carried an API credential; triggers the
    /// ownership check.
    pub caller: Option<ApiCaller>,
}

/// Result of [`create_run`].
#[derive(Debug, Clone)]
pub struct CreateRunOutcome {
    pub run_id: RunId,
    /// `false` when an in-flight run with the same dedup key was
    /// returned instead of creating a new one.
    pub created: bool,
}

/// Create a run and start delivering it.
///
/// Returns as soon as the run row exists; delivery (with retries per
/// the machine type's policy) continues in a detached task.
pub async fn create_run(
    pool: &DbPool,
    storage: &dyn ObjectStorage,
    urls: &StorageUrlConfig,
    client: Arc<MachineClient>,
    public_origin: &str,
    cancel: &CancellationToken,
    params: CreateRunParams,
) -> Result<CreateRunOutcome, DispatchError> {
    validate_origin(&params.origin)?;

    // Resolve references. Disabled machines are invisible here.
    let machine = MachineRepo::find_enabled_by_id(pool, params.machine_id)
        .await?
        .ok_or(DispatchError::MachineNotFound)?;
    let machine_type = MachineType::from_name(&machine.machine_type)?;

    let version = WorkflowVersionRepo::find_with_owner(pool, params.workflow_version_id)
        .await?
        .ok_or(DispatchError::WorkflowVersionNotFound)?;

    if let Some(caller) = &params.caller {
        authorize_caller(
            caller,
            version.owner_user_id.as_deref(),
            version.owner_org_id.as_deref(),
        )?;
    }

    // Rewrite inputs: inline images go to object storage first, then
    // the (possibly replaced) values are injected into the stored
    // workflow-API document.
    let inputs = match params.inputs {
        Some(map) => Some(resolve_inline_images(storage, urls, map).await?),
        None => None,
    };

    let mut workflow_api = version.workflow_api.clone();
    if let Some(map) = &inputs {
        let written = apply_inputs(&mut workflow_api, map);
        tracing::debug!(
            workflow_version_id = version.id,
            inputs = map.len(),
            written,
            "Injected caller inputs"
        );
    }

    let inputs_value = inputs.map(serde_json::Value::Object);
    let key = dedup_key(
        version.id,
        machine.id,
        inputs_value.as_ref(),
        &params.origin,
    );

    let creation = RunRepo::create(
        pool,
        &CreateRun {
            id: RunId::new_v4(),
            workflow_id: version.workflow_id,
            workflow_version_id: version.id,
            machine_id: machine.id,
            inputs: inputs_value,
            origin: params.origin,
            dedup_key: key,
        },
    )
    .await?;

    let run = creation.run();
    let outcome = match &creation {
        RunCreation::Existing(existing) => {
            tracing::info!(
                run_id = %existing.id,
                "Returning existing in-flight run for identical request"
            );
            return Ok(CreateRunOutcome {
                run_id: existing.id,
                created: false,
            });
        }
        RunCreation::Created(_) => CreateRunOutcome {
            run_id: run.id,
            created: true,
        },
    };

    let payload = RunPayload {
        run_id: run.id,
        workflow_api,
        status_endpoint: format!("{public_origin}/api/v1/runs/update"),
        file_upload_endpoint: format!("{public_origin}/api/v1/files/upload"),
    };

    // Detached, best-effort delivery. The handler responds before this
    // finishes; graceful shutdown cancels it.
    let task_pool = pool.clone();
    let task_cancel = cancel.clone();
    let payload_run_id = payload.run_id;
    tokio::spawn(async move {
        tokio::select! {
            _ = task_cancel.cancelled() => {
                tracing::warn!(run_id = %payload_run_id, "Delivery cancelled by shutdown");
            }
            _ = deliver(task_pool, client, machine, machine_type, payload) => {}
        }
    });

    Ok(outcome)
}

/// Deliver a run to its machine and record the result.
async fn deliver(
    pool: DbPool,
    client: Arc<MachineClient>,
    machine: Machine,
    machine_type: MachineType,
    payload: RunPayload,
) {
    let run_id = payload.run_id;

    // A remote token-authenticated machine without a token is a
    // configuration error, not a retryable failure.
    if machine_type == MachineType::TokenServerless
        && machine.auth_token.is_none()
        && !is_local_endpoint(&machine.endpoint)
    {
        tracing::error!(
            run_id = %run_id,
            machine_id = machine.id,
            "Machine auth token not configured; failing run"
        );
        record_failure(&pool, run_id).await;
        return;
    }

    let policy = RetryPolicy::for_machine_type(machine_type);
    match client
        .dispatch(&machine, machine_type, &payload, &policy)
        .await
    {
        Ok(DeliveryOutcome::Delivered) => {
            tracing::info!(run_id = %run_id, machine_id = machine.id, "Run delivered");
            if let Err(e) = RunRepo::mark_started(&pool, run_id).await {
                tracing::error!(run_id = %run_id, error = %e, "Failed to record run start");
            }
        }
        Ok(DeliveryOutcome::AssumedAccepted) => {
            // Status stays not-started; the machine's callback (or
            // cleanup) reconciles it later.
        }
        Err(failure) => {
            tracing::error!(
                run_id = %run_id,
                machine_id = machine.id,
                error = ?failure,
                "Dispatch exhausted retries; failing run"
            );
            record_failure(&pool, run_id).await;
        }
    }
}

/// Mark a run failed, logging rather than propagating errors -- this
/// runs in a detached task with no caller to report to.
async fn record_failure(pool: &DbPool, run_id: RunId) {
    if let Err(e) = RunRepo::mark_failed(pool, run_id).await {
        tracing::error!(run_id = %run_id, error = %e, "Failed to record run failure");
    }
}

/// Cross-tenant ownership check for API-credentialed callers.
///
/// Org credentials must match the workflow's org. User credentials must
/// match the workflow's owner when the workflow has no org; workflows
/// owned by an org are only reachable with an org credential.
fn authorize_caller(
    caller: &ApiCaller,
    owner_user_id: Option<&str>,
    owner_org_id: Option<&str>,
) -> Result<(), DispatchError> {
    let allowed = match &caller.org_id {
        Some(org) => owner_org_id == Some(org.as_str()),
        None => owner_org_id.is_none() && owner_user_id == Some(caller.user_id.as_str()),
    };
    if allowed {
        Ok(())
    } else {
        Err(DispatchError::WorkflowNotFound)
    }
}

/// Upload any inline data-URI values and replace them with their public
/// URLs. Awaited before dispatch so the machine only ever sees URLs.
async fn resolve_inline_images(
    storage: &dyn ObjectStorage,
    urls: &StorageUrlConfig,
    mut inputs: serde_json::Map<String, serde_json::Value>,
) -> Result<serde_json::Map<String, serde_json::Value>, StorageError> {
    for (name, value) in inputs.iter_mut() {
        let Some(text) = value.as_str() else { continue };
        if !is_data_uri(text) {
            continue;
        }
        let url = upload::upload_data_uri(storage, urls, text).await?;
        tracing::debug!(input = %name, url = %url, "Replaced inline image input with URL");
        *value = serde_json::Value::String(url);
    }
    Ok(inputs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn caller(user: &str, org: Option<&str>) -> ApiCaller {
        ApiCaller {
            user_id: user.to_string(),
            org_id: org.map(String::from),
        }
    }

    #[test]
    fn org_credential_must_match_workflow_org() {
        let c = caller("u1", Some("org-a"));
        assert!(authorize_caller(&c, Some("u2"), Some("org-a")).is_ok());
        assert_matches!(
            authorize_caller(&c, Some("u2"), Some("org-b")),
            Err(DispatchError::WorkflowNotFound)
        );
        assert_matches!(
            authorize_caller(&c, Some("u1"), None),
            Err(DispatchError::WorkflowNotFound)
        );
    }

    #[test]
    fn user_credential_must_own_orgless_workflow() {
        let c = caller("u1", None);
        assert!(authorize_caller(&c, Some("u1"), None).is_ok());
        assert_matches!(
            authorize_caller(&c, Some("u2"), None),
            Err(DispatchError::WorkflowNotFound)
        );
    }

    #[test]
    fn user_credential_cannot_reach_org_workflow() {
        let c = caller("u1", None);
        assert_matches!(
            authorize_caller(&c, Some("u1"), Some("org-a")),
            Err(DispatchError::WorkflowNotFound)
        );
    }

    #[test]
    fn authorization_failure_reads_as_not_found() {
        assert_eq!(DispatchError::WorkflowNotFound.to_string(), "Workflow not found");
    }
}
