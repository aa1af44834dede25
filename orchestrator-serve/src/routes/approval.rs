//! Submit approval decision (§4.1/§4.8): records the decision against the
//! suspended workflow and kicks off its resumption in the background. The
//! caller gets a plain acknowledgement here; watching the continuation happens
//! through the resume endpoint's SSE stream.

use axum::extract::State;
use axum::Json;
use orchestrator_core::state::{ApprovalDecision, WorkflowStatus};
use orchestrator_core::{ApprovalDecisionEvent, OrchestratorError};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::errors::ApiError;
use crate::routes::resume::{load_and_apply, resume_workflow_to_stream};
use crate::state::AppState;
use crate::workflow_bridge::persist_snapshot;

#[derive(Debug, Deserialize)]
pub struct ApprovalDecisionRequest {
    pub workflow_id: String,
    pub approval_id: String,
    pub decision: ApprovalDecision,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApprovalDecisionResponse {
    pub workflow_id: String,
    pub approval_id: String,
    pub decision: ApprovalDecision,
    pub resumed: bool,
}

pub async fn submit_decision(
    State(state): State<AppState>,
    Json(req): Json<ApprovalDecisionRequest>,
) -> Result<Json<ApprovalDecisionResponse>, ApiError> {
    let event = ApprovalDecisionEvent {
        approval_id: req.approval_id.clone(),
        decision: req.decision,
        decider: None,
        reason: req.reason.clone(),
    };

    let response = apply_decision_and_maybe_resume(&state, &req.workflow_id, event).await?;
    Ok(Json(response))
}

/// Applies a decision to the workflow named by `workflow_id` and, if that leaves
/// it resumable, spawns its continuation in the background. Shared by the
/// webhook-style `/approvals/decision` route and the polling-fallback loop
/// (§4.8 item 3(b)) so both decision-ingress paths behave identically.
pub async fn apply_decision_and_maybe_resume(
    state: &AppState,
    workflow_id: &str,
    event: ApprovalDecisionEvent,
) -> Result<ApprovalDecisionResponse, ApiError> {
    let approval_id = event.approval_id.clone();
    let decision = event.decision;

    let wf_state = load_and_apply(state, workflow_id, Some(event))
        .await?
        .ok_or_else(|| {
            ApiError::from(OrchestratorError::NotFound(format!(
                "workflow {workflow_id} not found"
            )))
        })?;

    persist_snapshot(&state.store, &wf_state)
        .await
        .map_err(|e| ApiError::from(OrchestratorError::Internal(e.to_string())))?;

    let resumed = matches!(
        wf_state.status,
        WorkflowStatus::AwaitingApproval | WorkflowStatus::Paused
    );

    if resumed {
        let (tx, mut rx) = mpsc::channel(128);
        tokio::spawn(resume_workflow_to_stream(state.clone(), wf_state, tx));
        // Drains the background run's events so the channel doesn't back up; the
        // caller watches progress via the resume endpoint, not this response.
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
    }

    Ok(ApprovalDecisionResponse {
        workflow_id: workflow_id.to_string(),
        approval_id,
        decision,
        resumed,
    })
}
