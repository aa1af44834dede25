//! Error types: node-level execution errors and the outward-facing error taxonomy.

use thiserror::Error;

use crate::graph::GraphInterrupt;

/// Error returned by a single node execution.
///
/// Kept small and generic so the graph engine can run any node; node-specific
/// failure detail belongs in [`OrchestratorError`], which most nodes wrap into
/// `AgentError::ExecutionFailed` via its `Display`.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A node failed; message carries enough detail to classify via [`OrchestratorError`].
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A node requested a human-in-the-loop pause.
    #[error("graph interrupted: {0}")]
    Interrupted(GraphInterrupt),
}

impl From<GraphInterrupt> for AgentError {
    fn from(interrupt: GraphInterrupt) -> Self {
        AgentError::Interrupted(interrupt)
    }
}

impl From<OrchestratorError> for AgentError {
    fn from(e: OrchestratorError) -> Self {
        AgentError::ExecutionFailed(e.to_string())
    }
}

/// Outward-facing error taxonomy.
///
/// Normative kinds; wire spelling (e.g. the SSE `error` frame's `code` field) is a
/// contract detail handled by the serving layer, not by this enum's `Display`.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("tool error: {0}")]
    ToolError(String),

    #[error("upstream corrupt: {0}")]
    UpstreamCorrupt(String),

    #[error("approval expired: {0}")]
    ApprovalExpired(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// Whether this error kind should be retried per the node's [`crate::graph::RetryPolicy`].
    ///
    /// Mirrors §4.4/§4.7: transport-level unavailability and timeouts are retryable,
    /// everything surfaced to the caller (bad input, auth, not-found, etc.) is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Unavailable(_) | OrchestratorError::DeadlineExceeded(_)
        )
    }

    /// Short machine-readable kind name, used as the SSE `error` frame's `code` field.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::InvalidArgument(_) => "INVALID_ARGUMENT",
            OrchestratorError::Unauthenticated => "UNAUTHENTICATED",
            OrchestratorError::NotFound(_) => "NOT_FOUND",
            OrchestratorError::FailedPrecondition(_) => "FAILED_PRECONDITION",
            OrchestratorError::Conflict(_) => "CONFLICT",
            OrchestratorError::Unavailable(_) => "UNAVAILABLE",
            OrchestratorError::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
            OrchestratorError::ToolError(_) => "TOOL_ERROR",
            OrchestratorError::UpstreamCorrupt(_) => "UPSTREAM_CORRUPT",
            OrchestratorError::ApprovalExpired(_) => "APPROVAL_EXPIRED",
            OrchestratorError::Cancelled => "CANCELLED",
            OrchestratorError::Internal(_) => "INTERNAL",
        }
    }
}
