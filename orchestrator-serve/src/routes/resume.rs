//! Resume workflow (§4.1): reactivates a suspended run, optionally applying an
//! approval decision first, and streams the continuation.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::Stream;
use orchestrator_core::graph::RunnableConfig;
use orchestrator_core::ids::WorkflowId;
use orchestrator_core::state::{ApprovalDecision, WorkflowStatus};
use orchestrator_core::workflow::{build_workflow_graph_with_checkpointer, WorkflowGraphConfig};
use orchestrator_core::{ApprovalDecisionEvent, OrchestratorError, WorkflowState};
use orchestrator_protocol::ProtocolEvent;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::errors::ApiError;
use crate::sse::sse_response;
use crate::state::AppState;
use crate::workflow_bridge::spawn_workflow_stream;

#[derive(Debug, Deserialize)]
pub struct ResumeRequest {
    pub workflow_id: String,
    #[serde(default)]
    pub approval_decision: Option<ApprovalDecisionPayload>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalDecisionPayload {
    pub approval_id: String,
    pub decision: ApprovalDecision,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Loads the workflow's latest checkpoint, applies `decision` if given, and
/// returns the merged state ready to resume from `state.current_node`.
///
/// `Ok(None)` means the workflow has no checkpoint (unknown id).
pub async fn load_and_apply(
    state: &AppState,
    workflow_id: &str,
    decision: Option<ApprovalDecisionEvent>,
) -> Result<Option<WorkflowState>, ApiError> {
    let config = RunnableConfig {
        thread_id: Some(workflow_id.to_string()),
        ..Default::default()
    };

    let tuple = state
        .checkpointer
        .get_tuple(&config)
        .await
        .map_err(|e| ApiError::from(OrchestratorError::Internal(e.to_string())))?;

    let Some((checkpoint, _)) = tuple else {
        return Ok(None);
    };
    let mut wf_state = checkpoint.channel_values;

    if let Some(event) = decision {
        orchestrator_core::record_decision(&mut wf_state, event)
            .map_err(ApiError::from)?;
    }

    Ok(Some(wf_state))
}

pub async fn resume(
    State(state): State<AppState>,
    Json(req): Json<ResumeRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, ApiError> {
    let decision_event = req.approval_decision.as_ref().map(|d| ApprovalDecisionEvent {
        approval_id: d.approval_id.clone(),
        decision: d.decision,
        decider: None,
        reason: d.reason.clone(),
    });

    let wf_state = load_and_apply(&state, &req.workflow_id, decision_event)
        .await?
        .ok_or_else(|| {
            ApiError::from(OrchestratorError::NotFound(format!(
                "workflow {} not found",
                req.workflow_id
            )))
        })?;

    if !matches!(
        wf_state.status,
        WorkflowStatus::AwaitingApproval | WorkflowStatus::Paused
    ) {
        return Err(ApiError::from(OrchestratorError::FailedPrecondition(
            format!("workflow {} is not suspended", req.workflow_id),
        )));
    }

    let keepalive = state.config.keepalive_interval;
    let (tx, rx) = mpsc::channel(128);
    tokio::spawn(resume_workflow_to_stream(state, wf_state, tx));

    Ok(sse_response(ReceiverStream::new(rx), keepalive))
}

pub async fn resume_workflow_to_stream(
    state: AppState,
    wf_state: WorkflowState,
    tx: mpsc::Sender<ProtocolEvent>,
) {
    let workflow_id: WorkflowId = wf_state.workflow_id.clone();
    let resume_node = wf_state.current_node.clone();

    let graph_config = WorkflowGraphConfig {
        llm: Arc::clone(&state.llm),
        tool_source: Arc::clone(&state.tool_source),
        prompts: state.prompts.clone(),
    };

    let compiled = match build_workflow_graph_with_checkpointer(graph_config, Arc::clone(&state.checkpointer)) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            let _ = tx
                .send(ProtocolEvent::Error {
                    kind: "INTERNAL".to_string(),
                    message: format!("failed to compile workflow graph: {e}"),
                })
                .await;
            let _ = tx.send(ProtocolEvent::Done).await;
            return;
        }
    };

    let run_config = RunnableConfig {
        thread_id: Some(workflow_id.as_str().to_string()),
        resume_from_node_id: Some(resume_node),
        ..Default::default()
    };

    let mut events = spawn_workflow_stream(
        compiled,
        wf_state,
        Some(run_config),
        Arc::clone(&state.store),
        Arc::clone(&state.approval_tracker),
    );

    while let Some(ev) = events.next().await {
        if tx.send(ev).await.is_err() {
            return;
        }
    }
}
