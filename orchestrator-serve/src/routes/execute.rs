//! Submit execute stream (§4.1): starts a fresh workflow run and streams its
//! progress until completion or the first suspension.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::Stream;
use orchestrator_core::graph::RunnableConfig;
use orchestrator_core::ids::{SessionId, WorkflowId};
use orchestrator_core::workflow::{build_workflow_graph_with_checkpointer, WorkflowGraphConfig};
use orchestrator_core::{Message, OrchestratorError, WorkflowState, WorkflowStatus};
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
pub struct ExecuteRequest {
    pub instruction: String,
    pub session_id: String,
    #[serde(default)]
    pub workspace_context: Option<String>,
}

pub async fn execute(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, ApiError> {
    if req.instruction.trim().is_empty() {
        return Err(ApiError::from(OrchestratorError::InvalidArgument(
            "instruction must not be empty".into(),
        )));
    }

    let keepalive = state.config.keepalive_interval;
    let (tx, rx) = mpsc::channel(128);

    let instruction = if let Some(ctx) = &req.workspace_context {
        format!("{}\n\nWorkspace context:\n{ctx}", req.instruction)
    } else {
        req.instruction.clone()
    };

    tokio::spawn(run_workflow_to_stream(state, instruction, req.session_id, tx));

    Ok(sse_response(ReceiverStream::new(rx), keepalive))
}

/// Builds a fresh `WorkflowState`, compiles the graph, and drives it to the first
/// suspension or completion, forwarding every event to `tx`. Shared by the chat
/// endpoint's workflow-routed path and the dedicated execute endpoint.
pub async fn run_workflow_to_stream(
    state: AppState,
    instruction: String,
    session_id: String,
    tx: mpsc::Sender<ProtocolEvent>,
) {
    let workflow_id = WorkflowId::new();
    let mut wf_state = WorkflowState::new(workflow_id.clone(), SessionId::from(session_id), "delegate_task");
    wf_state.messages.push(Message::user(instruction));
    wf_state.status = WorkflowStatus::Running;

    let _ = tx
        .send(ProtocolEvent::Status {
            workflow_id: workflow_id.as_str().to_string(),
            status: "running".to_string(),
        })
        .await;

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
