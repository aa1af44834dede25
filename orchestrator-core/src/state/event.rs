//! Append-only event log records: the source of truth a [`crate::state::WorkflowState`]
//! snapshot is folded from.

use serde::{Deserialize, Serialize};

use crate::ids::WorkflowId;

/// Discriminant for one [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StateInit,
    NodeEntered,
    NodeExited,
    MessageAppended,
    SubTaskUpdated,
    ToolInvoked,
    ToolResulted,
    ApprovalRequested,
    ApprovalDecided,
    Checkpointed,
    Failed,
    Completed,
    Cancelled,
    CaptureInsight,
}

/// One append-only log record for a workflow.
///
/// `seq` is strictly increasing per workflow, starting at 1 with no gaps
/// (see the event-monotonicity property in the testable-properties section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub seq: u64,
    pub workflow_id: WorkflowId,
    pub kind: EventKind,
    pub payload: serde_json::Value,
    pub timestamp: i64,
    pub causing_node: String,
}

impl Event {
    pub fn new(
        seq: u64,
        workflow_id: WorkflowId,
        kind: EventKind,
        payload: serde_json::Value,
        causing_node: impl Into<String>,
    ) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            seq,
            workflow_id,
            kind,
            payload,
            timestamp,
            causing_node: causing_node.into(),
        }
    }
}
