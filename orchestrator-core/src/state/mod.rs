//! Workflow state: the durable record per run, plus the append-only event log it is
//! folded from, plus the scratch [`ReActState`] used inside a single role's execution.

pub mod event;
pub mod react_state;
pub mod workflow_state;

pub use event::{Event, EventKind};
pub use react_state::{ReActState, ToolCall, ToolResult};
pub use workflow_state::{
    AgentRole, Approval, ApprovalDecision, Insight, RiskLevel, SubTask, SubTaskStatus,
    WorkflowState, WorkflowStatus,
};
