//! Per-role configuration: one small static record per [`AgentRole`] instead of six
//! near-duplicate node types. [`executor::AgentExecutorNode`](super::executor::AgentExecutorNode)
//! is the single executor, parameterized by whichever `RoleConfig` matches the subtask
//! it is dispatched for.

use crate::state::AgentRole;

/// How an executor should interpret the assistant's reply for a given role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// A plain assistant message is the subtask's result.
    PlainMessage,
    /// The reply may carry tool calls that should be dispatched before the subtask
    /// is considered done.
    ToolCalls,
    /// The reply must parse as a JSON array of subtasks (supervisor only).
    StructuredSubtasks,
}

/// Static, per-role configuration: prompt, tool profile, model, output parsing mode.
#[derive(Debug, Clone, Copy)]
pub struct RoleConfig {
    pub role: AgentRole,
    /// Name consumed by the progressive tool loader's `agent_profile` strategy.
    pub tool_profile: &'static str,
    pub model: &'static str,
    pub output_mode: OutputMode,
    /// Subtasks from this role require approval at this risk level or above.
    pub approval_floor: Option<crate::state::RiskLevel>,
    /// Upper bound on think/act turns inside one subtask's executor run.
    pub max_turns: u32,
}

/// Resolves the static configuration for `role`.
pub fn role_config(role: AgentRole) -> RoleConfig {
    use crate::state::RiskLevel;

    match role {
        AgentRole::Supervisor => RoleConfig {
            role,
            tool_profile: "supervisor",
            model: "gpt-4.1",
            output_mode: OutputMode::StructuredSubtasks,
            approval_floor: None,
            max_turns: 1,
        },
        AgentRole::FeatureDev => RoleConfig {
            role,
            tool_profile: "feature-dev",
            model: "gpt-4.1",
            output_mode: OutputMode::ToolCalls,
            approval_floor: None,
            max_turns: 8,
        },
        AgentRole::CodeReview => RoleConfig {
            role,
            tool_profile: "code-review",
            model: "gpt-4.1",
            output_mode: OutputMode::ToolCalls,
            approval_floor: None,
            max_turns: 6,
        },
        AgentRole::Infrastructure => RoleConfig {
            role,
            tool_profile: "infrastructure",
            model: "gpt-4.1",
            output_mode: OutputMode::ToolCalls,
            approval_floor: Some(RiskLevel::High),
            max_turns: 8,
        },
        AgentRole::Cicd => RoleConfig {
            role,
            tool_profile: "cicd",
            model: "gpt-4.1",
            output_mode: OutputMode::ToolCalls,
            approval_floor: Some(RiskLevel::High),
            max_turns: 8,
        },
        AgentRole::Documentation => RoleConfig {
            role,
            tool_profile: "documentation",
            model: "gpt-4.1",
            output_mode: OutputMode::ToolCalls,
            approval_floor: None,
            max_turns: 6,
        },
    }
}
