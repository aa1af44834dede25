//! The canonical workflow nodes: `delegate_task`, `execute_task`, `analyze_results`,
//! `decide_next`, `approval_gate`, `handle_error`, `finalize_workflow`.
//!
//! `agent_executor` (the shared per-role runner) lives in [`super::executor`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AgentError;
use crate::graph::{GraphInterrupt, Interrupt, Next, Node, RetryPolicy};
use crate::hitl::DEFAULT_APPROVAL_DEADLINE_MS;
use crate::ids::uuid6;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::{
    Approval, ApprovalDecision, AgentRole, Insight, RiskLevel, SubTask, SubTaskStatus,
    WorkflowState, WorkflowStatus,
};
use tracing::debug;

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

fn touch(state: &mut WorkflowState, node_id: &str) {
    state.current_node = node_id.to_string();
    state.updated_at = now_millis();
}

/// One subtask in the plan the supervisor returns.
#[derive(Debug, Deserialize)]
struct PlannedSubTask {
    id: String,
    #[serde(rename = "role")]
    agent_role: AgentRole,
    description: String,
    #[serde(default)]
    depends_on: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DelegatePlan {
    subtasks: Vec<PlannedSubTask>,
    risk_level: RiskLevel,
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed.strip_prefix("```json").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("```").unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn parse_plan(content: &str) -> Result<DelegatePlan, serde_json::Error> {
    serde_json::from_str(strip_code_fence(content))
}

/// Supervisor role: decomposes the request in `messages` into an ordered subtask
/// plan plus a risk estimate. A malformed reply gets one corrective retry before
/// the node fails.
pub struct DelegateTaskNode {
    pub llm: Arc<dyn LlmClient>,
    pub system_prompt: String,
}

#[async_trait]
impl Node<WorkflowState> for DelegateTaskNode {
    fn id(&self) -> &str {
        "delegate_task"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        touch(&mut state, self.id());
        debug!(workflow_id = %state.workflow_id.as_str(), node = self.id(), "delegating to supervisor");

        let mut messages = vec![Message::system(self.system_prompt.clone())];
        messages.extend(state.messages.iter().cloned());

        let response = self.llm.invoke(&messages).await?;
        let plan = match parse_plan(&response.content) {
            Ok(plan) => plan,
            Err(first_err) => {
                let mut retry_messages = messages.clone();
                retry_messages.push(Message::assistant(response.content.clone()));
                retry_messages.push(Message::user(format!(
                    "That reply did not parse as JSON ({first_err}). \
                     Reply with only a JSON object: {{\"subtasks\": [...], \"risk_level\": \"low\"|\"medium\"|\"high\"|\"critical\"}}."
                )));
                let retry_response = self.llm.invoke(&retry_messages).await?;
                parse_plan(&retry_response.content).map_err(|e| {
                    AgentError::ExecutionFailed(format!(
                        "delegate_task: supervisor reply did not parse as a subtask plan after one retry: {e}"
                    ))
                })?
            }
        };

        state.subtasks = plan
            .subtasks
            .into_iter()
            .map(|p| SubTask {
                id: p.id,
                agent_role: p.agent_role,
                description: p.description,
                depends_on: p.depends_on,
                status: SubTaskStatus::Pending,
                attempts: 0,
                last_error: None,
            })
            .collect();
        state.risk_level = plan.risk_level;
        state.messages.push(Message::assistant(response.content));
        state.status = WorkflowStatus::Running;

        Ok((state, Next::Node("execute_task".to_string())))
    }
}

/// Dispatches the next subtask whose dependencies are satisfied. If none is ready
/// (none pending, or the ready ones already ran), hands off to `decide_next` instead
/// of guessing.
pub struct ExecuteTaskNode;

#[async_trait]
impl Node<WorkflowState> for ExecuteTaskNode {
    fn id(&self) -> &str {
        "execute_task"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        touch(&mut state, self.id());
        debug!(workflow_id = %state.workflow_id.as_str(), node = self.id(), "looking for a ready subtask");

        let ready_idx = {
            let subtasks = state.subtasks.clone();
            subtasks.iter().position(|t| {
                t.status == SubTaskStatus::Pending && t.is_ready(&subtasks)
            })
        };

        match ready_idx {
            Some(idx) => {
                state.subtasks[idx].status = SubTaskStatus::Running;
                state.status = WorkflowStatus::Running;
                Ok((state, Next::Node("agent_executor".to_string())))
            }
            None => Ok((state, Next::Node("decide_next".to_string()))),
        }
    }
}

/// Captures an insight from the subtask `agent_executor` just finished and leaves
/// routing to `decide_next`.
pub struct AnalyzeResultsNode;

#[async_trait]
impl Node<WorkflowState> for AnalyzeResultsNode {
    fn id(&self) -> &str {
        "analyze_results"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        touch(&mut state, self.id());
        debug!(workflow_id = %state.workflow_id.as_str(), node = self.id(), "analyzing last subtask result");

        let target = state.subtasks.iter().enumerate().find(|(_, t)| {
            matches!(t.status, SubTaskStatus::Done | SubTaskStatus::Failed)
                && !state
                    .captured_insights
                    .iter()
                    .any(|i| i.node == "analyze_results" && i.text.contains(&marker(t)))
        });

        if let Some((_, task)) = target {
            let text = match task.status {
                SubTaskStatus::Done => format!("{} completed by {}", marker(task), task.agent_role.as_str()),
                SubTaskStatus::Failed => format!(
                    "{} failed on {}: {}",
                    marker(task),
                    task.agent_role.as_str(),
                    task.last_error.clone().unwrap_or_default()
                ),
                _ => unreachable!(),
            };
            state.captured_insights.push(Insight {
                node: "analyze_results".to_string(),
                text,
                created_at: now_millis(),
            });
        }

        Ok((state, Next::Node("decide_next".to_string())))
    }
}

fn marker(task: &SubTask) -> String {
    format!("{}@{}", task.id, task.attempts)
}

fn approved(state: &WorkflowState) -> bool {
    state
        .approval
        .as_ref()
        .is_some_and(|a| a.decision == Some(ApprovalDecision::Approve))
}

/// Pure routing predicate: `execute_task` if there is a ready subtask, else
/// `approval_gate` if risk is high and not yet approved, else `handle_error` if a
/// subtask failed, else `finalize_workflow`.
pub fn decide_next(state: &WorkflowState) -> String {
    if state.subtasks.iter().any(|t| t.status == SubTaskStatus::Failed) {
        return "handle_error".to_string();
    }
    if state.risk_level >= RiskLevel::High && !approved(state) {
        return "approval_gate".to_string();
    }
    if state
        .subtasks
        .iter()
        .any(|t| t.status == SubTaskStatus::Pending && t.is_ready(&state.subtasks))
    {
        return "execute_task".to_string();
    }
    "finalize_workflow".to_string()
}

/// Mutates state to reflect the routing decision so the mutation survives even when
/// the next node (`approval_gate`) suspends the run via an interrupt; the graph's
/// conditional edge re-derives the same key from this node's output via [`decide_next`].
pub struct DecideNextNode;

#[async_trait]
impl Node<WorkflowState> for DecideNextNode {
    fn id(&self) -> &str {
        "decide_next"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        touch(&mut state, self.id());
        debug!(workflow_id = %state.workflow_id.as_str(), node = self.id(), "routing to next step");

        match decide_next(&state).as_str() {
            "approval_gate" => {
                if state.approval.is_none() {
                    let created_at = now_millis();
                    state.approval = Some(Approval {
                        id: uuid6().to_string(),
                        kind: "risk_gate".to_string(),
                        created_at,
                        decided_at: None,
                        decision: None,
                        decider: None,
                        reason: None,
                        deadline: Some(created_at + DEFAULT_APPROVAL_DEADLINE_MS),
                    });
                }
                state.status = WorkflowStatus::AwaitingApproval;
            }
            _ => {
                state.status = WorkflowStatus::Running;
            }
        }

        Ok((state, Next::Continue))
    }
}

/// Suspends the run via [`GraphInterrupt`] until a decision is recorded on
/// `state.approval`; once one is, proceeds or routes to `finalize_workflow` on reject.
pub struct ApprovalGateNode;

#[async_trait]
impl Node<WorkflowState> for ApprovalGateNode {
    fn id(&self) -> &str {
        "approval_gate"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        touch(&mut state, self.id());
        debug!(workflow_id = %state.workflow_id.as_str(), node = self.id(), "checking approval decision");

        let decision = state.approval.as_ref().and_then(|a| a.decision);
        match decision {
            None => {
                let payload = serde_json::json!({
                    "workflow_id": state.workflow_id.as_str(),
                    "approval_id": state.approval.as_ref().map(|a| a.id.clone()),
                    "risk_level": state.risk_level,
                });
                Err(AgentError::Interrupted(GraphInterrupt(Interrupt::new(payload))))
            }
            Some(ApprovalDecision::Approve) => {
                state.status = WorkflowStatus::Running;
                Ok((state, Next::Node("execute_task".to_string())))
            }
            Some(ApprovalDecision::Reject) => {
                state.status = WorkflowStatus::Cancelled;
                Ok((state, Next::Node("finalize_workflow".to_string())))
            }
        }
    }
}

/// Retries the first failed subtask with exponential backoff (base 500ms, cap 8s, budget 2
/// attempts); once the budget is exhausted, marks the workflow failed and routes to
/// `finalize_workflow`.
pub struct HandleErrorNode {
    pub retry_policy: RetryPolicy,
}

impl Default for HandleErrorNode {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::exponential(
                2,
                Duration::from_millis(500),
                Duration::from_secs(8),
                2.0,
            ),
        }
    }
}

#[async_trait]
impl Node<WorkflowState> for HandleErrorNode {
    fn id(&self) -> &str {
        "handle_error"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        touch(&mut state, self.id());
        debug!(workflow_id = %state.workflow_id.as_str(), node = self.id(), "handling failed subtask");

        let idx = state
            .subtasks
            .iter()
            .position(|t| t.status == SubTaskStatus::Failed);

        let Some(idx) = idx else {
            return Ok((state, Next::Node("decide_next".to_string())));
        };

        let attempt = state.subtasks[idx].attempts.saturating_sub(1) as usize;
        *state.retries.entry(state.subtasks[idx].id.clone()).or_insert(0) += 1;

        if self.retry_policy.should_retry(attempt) {
            let delay = self.retry_policy.delay(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            state.subtasks[idx].status = SubTaskStatus::Pending;
            Ok((state, Next::Node("execute_task".to_string())))
        } else {
            state.status = WorkflowStatus::Failed;
            Ok((state, Next::Node("finalize_workflow".to_string())))
        }
    }
}

/// Compiles the final assistant message summarizing subtask outcomes and marks the
/// workflow completed (unless it was already marked failed by `handle_error` or
/// `approval_gate`).
pub struct FinalizeWorkflowNode;

#[async_trait]
impl Node<WorkflowState> for FinalizeWorkflowNode {
    fn id(&self) -> &str {
        "finalize_workflow"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        touch(&mut state, self.id());
        debug!(workflow_id = %state.workflow_id.as_str(), node = self.id(), "finalizing workflow");

        let done = state
            .subtasks
            .iter()
            .filter(|t| t.status == SubTaskStatus::Done)
            .count();
        let failed = state
            .subtasks
            .iter()
            .filter(|t| t.status == SubTaskStatus::Failed)
            .count();
        let mut summary = format!(
            "Workflow finished: {done} subtask(s) done, {failed} failed, out of {}.",
            state.subtasks.len()
        );
        if state.status == WorkflowStatus::Cancelled {
            if let Some(reason) = state.approval.as_ref().and_then(|a| a.reason.as_deref()) {
                summary.push_str(&format!(" Rejected: {reason}."));
            }
        }
        state.messages.push(Message::assistant(summary));

        if !matches!(state.status, WorkflowStatus::Failed | WorkflowStatus::Cancelled) {
            state.status = WorkflowStatus::Completed;
        }

        Ok((state, Next::End))
    }
}
