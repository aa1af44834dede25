//! Tool source abstraction: list tools and call a tool.
//!
//! Agent role nodes depend on `ToolSource` instead of a concrete tool registry, so the
//! workflow graph engine never talks to a transport directly. The only real
//! implementation is [`McpToolSource`], which connects to an MCP server over stdio or
//! Streamable HTTP. [`MockToolSource`] is an in-memory fake for tests.

mod context;
mod mcp;

pub use context::ToolCallContext;
pub use mcp::{McpHttpSession, McpSession, McpSessionError, McpToolSource};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Tool specification, aligned with MCP `tools/list` result item.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    /// Tool name (used in MCP `tools/call`).
    pub name: String,
    /// Human-readable description for the LLM.
    pub description: Option<String>,
    /// JSON Schema for arguments (MCP `inputSchema`).
    pub input_schema: Value,
}

/// Result of a single tool call; aligns with MCP `tools/call` content.
#[derive(Debug, Clone)]
pub struct ToolCallContent {
    /// Result text (e.g. joined from MCP `result.content[].text`).
    pub text: String,
}

/// Errors from listing or calling tools.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("MCP/transport error: {0}")]
    Transport(String),
    #[error("JSON-RPC error: {0}")]
    JsonRpc(String),
}

/// Tool source: list tools and call a tool.
///
/// Agent role nodes depend on this instead of a concrete `ToolRegistry`. The
/// progressive tool loader calls `list_tools()` to build the subset of specs
/// exposed to a given role; execution calls `call_tool`/`call_tool_with_context`.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Lists available tools (e.g. MCP `tools/list`).
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    /// Calls a tool by name with JSON arguments (e.g. MCP `tools/call`).
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError>;

    /// Calls a tool with optional per-step context (e.g. current messages).
    /// Default implementation ignores `ctx` and calls `call_tool`.
    async fn call_tool_with_context(
        &self,
        name: &str,
        arguments: Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let _ = ctx;
        self.call_tool(name, arguments).await
    }

    /// Injects per-step context before tool calls. Default is a no-op;
    /// implementations that need context override it.
    fn set_call_context(&self, _ctx: Option<ToolCallContext>) {}
}

/// In-memory fake satisfying [`ToolSource`] for tests, so the graph engine and
/// HTTP layer can be exercised without spawning an MCP server.
pub struct MockToolSource {
    specs: Vec<ToolSpec>,
    responses: std::collections::HashMap<String, Result<String, String>>,
}

impl MockToolSource {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            responses: std::collections::HashMap::new(),
        }
    }

    /// Registers a tool spec and the text it returns when called.
    pub fn with_tool(mut self, spec: ToolSpec, response: impl Into<String>) -> Self {
        self.responses.insert(spec.name.clone(), Ok(response.into()));
        self.specs.push(spec);
        self
    }

    /// Registers a tool spec that errors with `message` when called.
    pub fn with_failing_tool(mut self, spec: ToolSpec, message: impl Into<String>) -> Self {
        self.responses.insert(spec.name.clone(), Err(message.into()));
        self.specs.push(spec);
        self
    }
}

impl Default for MockToolSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolSource for MockToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        Ok(self.specs.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        _arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        match self.responses.get(name) {
            Some(Ok(text)) => Ok(ToolCallContent { text: text.clone() }),
            Some(Err(message)) => Err(ToolSourceError::Transport(message.clone())),
            None => Err(ToolSourceError::NotFound(name.to_string())),
        }
    }
}
