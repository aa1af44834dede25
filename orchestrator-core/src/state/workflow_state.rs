//! The durable workflow state: the authoritative record the checkpoint store persists.

use serde::{Deserialize, Serialize};

use crate::ids::{SessionId, WorkflowId};
use crate::message::Message;

/// Coarse risk rating used to gate HITL approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// One of the six specialized roles a subtask may be delegated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    Supervisor,
    FeatureDev,
    CodeReview,
    Infrastructure,
    Cicd,
    Documentation,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Supervisor => "supervisor",
            AgentRole::FeatureDev => "feature-dev",
            AgentRole::CodeReview => "code-review",
            AgentRole::Infrastructure => "infrastructure",
            AgentRole::Cicd => "cicd",
            AgentRole::Documentation => "documentation",
        }
    }
}

/// Lifecycle status of one [`SubTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    Pending,
    Running,
    Blocked,
    Done,
    Failed,
    Cancelled,
}

/// A unit of delegated work assigned to one agent role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub agent_role: AgentRole,
    pub description: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub status: SubTaskStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl SubTask {
    /// A `SubTask` is only ready to run once every dependency named in `depends_on`
    /// is `done` in `all`.
    pub fn is_ready(&self, all: &[SubTask]) -> bool {
        self.depends_on.iter().all(|dep_id| {
            all.iter()
                .any(|t| &t.id == dep_id && t.status == SubTaskStatus::Done)
        })
    }
}

/// Decision on a pending [`Approval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// A human-in-the-loop approval gate: created when a workflow pauses for sign-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: String,
    pub kind: String,
    pub created_at: i64,
    #[serde(default)]
    pub decided_at: Option<i64>,
    #[serde(default)]
    pub decision: Option<ApprovalDecision>,
    #[serde(default)]
    pub decider: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Epoch millis after which this approval should be treated as expired if still
    /// undecided; `None` means no deadline was configured.
    #[serde(default)]
    pub deadline: Option<i64>,
}

/// A short free-form note surfaced by one node for later steps to read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub node: String,
    pub text: String,
    pub created_at: i64,
}

/// Overall workflow lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    AwaitingApproval,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    /// Once a workflow reaches one of these, no further state-changing events may append.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Cancelled
        )
    }
}

/// The authoritative, checkpointed state of one workflow run.
///
/// Mutated exclusively by graph engine nodes (§5's serialization guarantee) and by
/// HITL decision ingestion. Everything else reads via the checkpoint store or an
/// immutable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_id: WorkflowId,
    pub session_id: SessionId,
    pub created_at: i64,
    pub updated_at: i64,
    pub status: WorkflowStatus,
    pub messages: Vec<Message>,
    pub subtasks: Vec<SubTask>,
    pub current_node: String,
    #[serde(default)]
    pub next_node: Option<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub approval: Option<Approval>,
    #[serde(default)]
    pub captured_insights: Vec<Insight>,
    #[serde(default)]
    pub retries: std::collections::HashMap<String, u32>,
    pub config_fingerprint: String,
}

impl WorkflowState {
    pub fn new(workflow_id: WorkflowId, session_id: SessionId, entry_node: impl Into<String>) -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            workflow_id,
            session_id,
            created_at: now,
            updated_at: now,
            status: WorkflowStatus::Pending,
            messages: Vec::new(),
            subtasks: Vec::new(),
            current_node: entry_node.into(),
            next_node: None,
            risk_level: RiskLevel::Low,
            approval: None,
            captured_insights: Vec::new(),
            retries: std::collections::HashMap::new(),
            config_fingerprint: String::new(),
        }
    }

    /// Invariant: `awaiting_approval` implies an approval id is set and undecided.
    pub fn approval_invariant_holds(&self) -> bool {
        match self.status {
            WorkflowStatus::AwaitingApproval => self
                .approval
                .as_ref()
                .is_some_and(|a| a.decision.is_none()),
            _ => true,
        }
    }
}
