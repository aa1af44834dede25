//! Wire shape of a single Server-Sent Event the HTTP front door emits (§6 of the
//! service contract): `content` chunks during streaming, `status`/`subtask` progress
//! updates, `approval_pending` when a workflow suspends at a gate, a terminal `error`
//! or `done`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One SSE payload. Serializes to `{"type": "...", ...}`; the server writes
/// `data: <json>\n\n` with this as `<json>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// A fragment of assistant text, in order.
    Content { content: String },
    /// A workflow's lifecycle status changed.
    Status { workflow_id: String, status: String },
    /// One subtask's status changed.
    Subtask {
        id: String,
        status: String,
        agent_role: String,
    },
    /// The workflow suspended at an approval gate; `link` is a caller-displayable URL.
    ApprovalPending { approval_id: String, link: String },
    /// Terminal failure. `kind` is `OrchestratorError::kind()`.
    Error { kind: String, message: String },
    /// Terminal success; no further events follow on this stream.
    Done,
}

impl ProtocolEvent {
    /// Serializes to a `serde_json::Value` (e.g. for tests or re-embedding).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Serializes to the compact JSON string written as an SSE `data:` line.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
