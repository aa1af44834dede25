//! Get workflow status (§4.1): a snapshot of `WorkflowState` read from the
//! durable checkpoint store, not the graph engine's own checkpointer — a status
//! check must not depend on a worker currently holding the workflow.

use axum::extract::{Path, State};
use axum::Json;
use orchestrator_core::ids::WorkflowId;
use orchestrator_core::{OrchestratorError, WorkflowState};

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn get_status(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<WorkflowState>, ApiError> {
    let id = WorkflowId::from(workflow_id.clone());
    let snapshot = state
        .store
        .load_snapshot(&id)
        .await
        .map_err(|e| ApiError::from(OrchestratorError::Internal(e.to_string())))?;

    snapshot
        .map(Json)
        .ok_or_else(|| ApiError::from(OrchestratorError::NotFound(format!("workflow {workflow_id} not found"))))
}
