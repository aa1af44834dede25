//! The single agent executor node: parameterized over [`RoleConfig`] rather than
//! duplicated once per role. Dispatched by `execute_task` for the one [`SubTask`] it
//! just marked `running`; runs a nested think/act loop ([`super::react_node`]) seeded
//! with the role's system prompt and the subtask description, then appends the result
//! to [`WorkflowState`] and transitions the subtask to `done` or `failed`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::prompts::RolePrompts;
use crate::state::{SubTaskStatus, WorkflowState};
use crate::tool_source::ToolSource;
use tracing::debug;

use super::react_node::build_react_graph;
use super::roles::role_config;

/// Runs the dispatched subtask's role to completion via a nested think/act loop.
///
/// One instance of this node is wired into the workflow graph as `"agent_executor"`;
/// which role it runs is read from the single `running` subtask in `WorkflowState`,
/// not from a field on this struct.
pub struct AgentExecutorNode {
    pub llm: Arc<dyn LlmClient>,
    pub tool_source: Arc<dyn ToolSource>,
    pub prompts: RolePrompts,
}

#[async_trait]
impl Node<WorkflowState> for AgentExecutorNode {
    fn id(&self) -> &str {
        "agent_executor"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<(WorkflowState, Next), AgentError> {
        let idx = state
            .subtasks
            .iter()
            .position(|t| t.status == SubTaskStatus::Running)
            .ok_or_else(|| {
                AgentError::ExecutionFailed(
                    "agent_executor invoked with no running subtask".to_string(),
                )
            })?;

        let role = state.subtasks[idx].agent_role;
        debug!(
            workflow_id = %state.workflow_id.as_str(),
            node = self.id(),
            role = role.as_str(),
            "running subtask"
        );
        let config = role_config(role);
        let system_prompt = self.prompts.system_prompt(role).to_string();
        let description = state.subtasks[idx].description.clone();

        let react_graph = build_react_graph(
            self.llm.clone(),
            self.tool_source.clone(),
            config.max_turns,
        )
        .map_err(|e| AgentError::ExecutionFailed(format!("react graph compile failed: {e}")))?;

        let seed = crate::state::ReActState {
            messages: vec![Message::system(system_prompt), Message::user(description)],
            ..Default::default()
        };
        let outcome = react_graph.invoke(seed, None).await;

        let attempts = state.subtasks[idx].attempts + 1;
        state.subtasks[idx].attempts = attempts;

        match outcome {
            Ok(react_state) => {
                let tool_failures: Vec<&str> = react_state
                    .tool_results
                    .iter()
                    .filter(|r| r.content.starts_with("tool error:"))
                    .map(|r| r.content.as_str())
                    .collect();
                let reply = react_state
                    .last_assistant_reply()
                    .unwrap_or_else(|| "(no reply)".to_string());
                state.messages.push(Message::assistant(reply));

                if tool_failures.is_empty() {
                    state.subtasks[idx].status = SubTaskStatus::Done;
                    state.subtasks[idx].last_error = None;
                } else {
                    state.subtasks[idx].status = SubTaskStatus::Failed;
                    state.subtasks[idx].last_error = Some(tool_failures.join("; "));
                }
            }
            Err(e) => {
                state.subtasks[idx].status = SubTaskStatus::Failed;
                state.subtasks[idx].last_error = Some(e.to_string());
            }
        }

        Ok((state, Next::Node("analyze_results".to_string())))
    }
}
