//! Bridges the workflow graph engine's `StreamEvent<WorkflowState>` into the
//! wire-level [`ProtocolEvent`]s the SSE front door emits (§6), and persists the
//! resulting snapshot to the durable checkpoint store as the run progresses.

use std::collections::HashSet;
use std::sync::Arc;

use orchestrator_core::ids::WorkflowId;
use orchestrator_core::{
    ApprovalRequest, ApprovalTracker, CheckpointStoreError, CompiledStateGraph, Event, EventKind,
    RunnableConfig, SqlxCheckpointStore, StreamEvent, StreamMode, WorkflowState, WorkflowStatus,
};
use orchestrator_protocol::ProtocolEvent;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::warn;

fn workflow_status_str(status: WorkflowStatus) -> &'static str {
    match status {
        WorkflowStatus::Pending => "pending",
        WorkflowStatus::Running => "running",
        WorkflowStatus::AwaitingApproval => "awaiting_approval",
        WorkflowStatus::Paused => "paused",
        WorkflowStatus::Completed => "completed",
        WorkflowStatus::Failed => "failed",
        WorkflowStatus::Cancelled => "cancelled",
    }
}

/// Optimistic-concurrency snapshot write that converges on the store's actual
/// version instead of requiring the caller to track it: a `VersionConflict`
/// reports the version it rejected, so the write retries once at that version.
pub async fn persist_snapshot(
    store: &SqlxCheckpointStore,
    state: &WorkflowState,
) -> Result<(), CheckpointStoreError> {
    let mut expected = 0u32;
    loop {
        match store.write_snapshot(state, expected).await {
            Ok(_) => return Ok(()),
            Err(CheckpointStoreError::VersionConflict { actual, .. }) => expected = actual,
            Err(e) => return Err(e),
        }
    }
}

/// The event kind one node step folds into the log, derived from the resulting
/// status. A terminal status gets its own kind so the log itself shows why a
/// workflow stopped without needing the snapshot; everything else is a plain
/// node transition.
fn event_kind_for_step(state: &WorkflowState) -> EventKind {
    match state.status {
        WorkflowStatus::Completed => EventKind::Completed,
        WorkflowStatus::Failed => EventKind::Failed,
        WorkflowStatus::Cancelled => EventKind::Cancelled,
        WorkflowStatus::AwaitingApproval
            if state
                .approval
                .as_ref()
                .is_some_and(|a| a.decision.is_none()) =>
        {
            EventKind::ApprovalRequested
        }
        _ => EventKind::NodeExited,
    }
}

/// Appends one event at `last_seq + 1`, logging and resyncing on conflict
/// instead of propagating, since this is a best-effort log alongside the
/// authoritative snapshot write. Returns the store's confirmed last seq.
async fn append_event(
    store: &SqlxCheckpointStore,
    last_seq: u64,
    workflow_id: &WorkflowId,
    kind: EventKind,
    payload: serde_json::Value,
    causing_node: &str,
) -> u64 {
    let event = Event::new(last_seq + 1, workflow_id.clone(), kind, payload, causing_node);
    match store
        .append_events(workflow_id, last_seq, std::slice::from_ref(&event))
        .await
    {
        Ok(new_last_seq) => new_last_seq,
        Err(CheckpointStoreError::Conflict { actual, .. }) => {
            warn!(
                workflow_id = %workflow_id.as_str(),
                expected = last_seq,
                actual,
                "event append seq conflict, resyncing"
            );
            actual
        }
        Err(e) => {
            warn!(workflow_id = %workflow_id.as_str(), error = %e, "event append failed");
            last_seq
        }
    }
}

/// Converts one graph-engine stream event into zero or more wire events. A
/// `Values` event (the final state of a run) yields a `status` event; node
/// `Updates` surface any newly pending approval and the current subtask list;
/// `Messages` chunks stream as `content`.
pub fn to_protocol_events(event: &StreamEvent<WorkflowState>) -> Vec<ProtocolEvent> {
    match event {
        StreamEvent::Values(state) => vec![ProtocolEvent::Status {
            workflow_id: state.workflow_id.as_str().to_string(),
            status: workflow_status_str(state.status).to_string(),
        }],
        StreamEvent::Updates { state, .. } => {
            let mut out = Vec::new();
            if let Some(approval) = &state.approval {
                if state.status == WorkflowStatus::AwaitingApproval && approval.decision.is_none()
                {
                    out.push(ProtocolEvent::ApprovalPending {
                        approval_id: approval.id.clone(),
                        link: format!("/approvals/{}", approval.id),
                    });
                }
            }
            for task in &state.subtasks {
                out.push(ProtocolEvent::Subtask {
                    id: task.id.clone(),
                    status: format!("{:?}", task.status).to_lowercase(),
                    agent_role: task.agent_role.as_str().to_string(),
                });
            }
            out
        }
        StreamEvent::Messages { chunk, .. } => vec![ProtocolEvent::Content {
            content: chunk.content.clone(),
        }],
        _ => Vec::new(),
    }
}

/// Drives a compiled workflow graph to completion or suspension, forwarding every
/// event as a wire-level [`ProtocolEvent`] and persisting the durable snapshot as
/// the run progresses. Runs on its own task so the SSE body can read from the
/// returned stream while the graph executes independently; dropping the returned
/// stream (client disconnect) drops the channel's sender half, which the task
/// notices on its next send and exits at — the best-effort cancellation point
/// this engine exposes, since individual nodes don't take a cancellation token.
pub fn spawn_workflow_stream(
    compiled: Arc<CompiledStateGraph<WorkflowState>>,
    initial_state: WorkflowState,
    run_config: Option<RunnableConfig>,
    store: Arc<SqlxCheckpointStore>,
    approval_tracker: Arc<dyn ApprovalTracker>,
) -> ReceiverStream<ProtocolEvent> {
    let (tx, rx) = mpsc::channel(128);
    let workflow_id = initial_state.workflow_id.clone();

    tokio::spawn(async move {
        let mut last_seq = match store.read_events(&workflow_id, None, None).await {
            Ok(events) => events.last().map(|e| e.seq).unwrap_or(0),
            Err(e) => {
                warn!(workflow_id = %workflow_id.as_str(), error = %e, "failed to read prior event log, starting from seq 0");
                0
            }
        };

        let modes = HashSet::from([StreamMode::Messages, StreamMode::Updates, StreamMode::Values]);
        let mut inner = compiled.stream(initial_state, run_config, modes);
        let mut announced_approval: Option<String> = None;

        while let Some(event) = inner.next().await {
            if let StreamEvent::Updates { node_id, state } = &event {
                let kind = event_kind_for_step(state);
                let payload = serde_json::json!({
                    "node_id": node_id,
                    "status": workflow_status_str(state.status),
                });
                last_seq = append_event(&store, last_seq, &state.workflow_id, kind, payload, node_id).await;
            }

            if let StreamEvent::Updates { state, .. } | StreamEvent::Values(state) = &event {
                if let Err(e) = persist_snapshot(&store, state).await {
                    warn!(workflow_id = %state.workflow_id.as_str(), error = %e, "snapshot persist failed");
                }
                if let Some(approval) = &state.approval {
                    if state.status == WorkflowStatus::AwaitingApproval
                        && approval.decision.is_none()
                        && announced_approval.as_deref() != Some(approval.id.as_str())
                    {
                        let request = ApprovalRequest {
                            workflow_id: state.workflow_id.as_str(),
                            approval_id: &approval.id,
                            summary: "workflow risk gate reached; review pending subtasks",
                            risk_level: state.risk_level,
                            deadline: approval.deadline.unwrap_or(0),
                        };
                        if let Err(e) = approval_tracker.create_approval(&request).await {
                            warn!(approval_id = %approval.id, error = %e, "failed to create approval record");
                        }
                        announced_approval = Some(approval.id.clone());
                    }
                }
            }

            for pe in to_protocol_events(&event) {
                if tx.send(pe).await.is_err() {
                    return;
                }
            }
        }

        let _ = tx.send(ProtocolEvent::Done).await;
    });

    ReceiverStream::new(rx)
}
