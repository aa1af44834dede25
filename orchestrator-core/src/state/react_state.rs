//! Scratch state for a single role's think/act/observe loop.
//!
//! Distinct from [`crate::state::WorkflowState`]: this is per-subtask working memory for one
//! role's execution inside `agent_executor`, not the durable, checkpointed workflow record.

use crate::llm::LlmUsage;
use crate::message::Message;
use serde::{Deserialize, Serialize};

/// A single tool invocation produced by the LLM during a think step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: String,
    pub id: Option<String>,
}

/// Result of executing one [`ToolCall`] during an act step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: Option<String>,
    pub name: Option<String>,
    pub content: String,
}

/// State threaded through one role's think → act → observe loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReActState {
    pub messages: Vec<Message>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    #[serde(default)]
    pub turn_count: u32,
    #[serde(default)]
    pub approval_result: Option<bool>,
    #[serde(default)]
    pub usage: Option<LlmUsage>,
    #[serde(default)]
    pub total_usage: Option<LlmUsage>,
}

impl Default for ReActState {
    fn default() -> Self {
        Self {
            messages: vec![],
            tool_calls: vec![],
            tool_results: vec![],
            turn_count: 0,
            approval_result: None,
            usage: None,
            total_usage: None,
        }
    }
}

impl ReActState {
    /// Content of the chronologically last assistant message, if any.
    pub fn last_assistant_reply(&self) -> Option<String> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Assistant { content, .. } => Some(content.clone()),
            _ => None,
        })
    }
}
