//! Conversation message types: role, content, and tool-call/result plumbing.
//!
//! `messages` on a [`crate::state::WorkflowState`] is append-only; nothing here
//! ever mutates an already-appended message.

use serde::{Deserialize, Serialize};

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A single tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Outcome status of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Ok,
    Error,
}

/// Result of executing one [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub status: ToolStatus,
    pub payload: serde_json::Value,
    pub latency_ms: u64,
}

/// A single message in a workflow's conversation history.
///
/// Roles: `System` (first, if present), `User`, `Assistant` (optionally carrying
/// `tool_calls`), `Tool` (a tool's reply, correlated via `tool_call_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
        timestamp: i64,
    },
    User {
        content: String,
        timestamp: i64,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
        timestamp: i64,
    },
    Tool {
        content: String,
        tool_call_id: String,
        timestamp: i64,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
            timestamp: now_millis(),
        }
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
            timestamp: now_millis(),
        }
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
            timestamp: now_millis(),
        }
    }

    /// Text content regardless of role, for logging and prompt assembly.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content, .. } => content,
            Message::User { content, .. } => content,
            Message::Assistant { content, .. } => content,
            Message::Tool { content, .. } => content,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Message::System { timestamp, .. }
            | Message::User { timestamp, .. }
            | Message::Assistant { timestamp, .. }
            | Message::Tool { timestamp, .. } => *timestamp,
        }
    }
}
