//! Mock LLM for tests.
//!
//! Returns a fixed assistant message and optional fixed tool_calls; configurable
//! "no tool_calls" to exercise the END path, and an optional stateful mode for
//! multi-round tests (first call returns tool_calls, second returns none).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;
use crate::state::ToolCall;
use crate::stream::MessageChunk;

pub struct MockLlm {
    content: String,
    tool_calls: Vec<ToolCall>,
    call_count: Option<AtomicUsize>,
    second_content: Option<String>,
    stream_by_char: AtomicBool,
    error: Option<String>,
}

impl MockLlm {
    /// Returns assistant text and no tool_calls.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
            call_count: None,
            second_content: None,
            stream_by_char: AtomicBool::new(false),
            error: None,
        }
    }

    /// Custom content and tool_calls.
    pub fn new(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            call_count: None,
            second_content: None,
            stream_by_char: AtomicBool::new(false),
            error: None,
        }
    }

    /// Stateful mock: first invoke() returns `tool_calls`, second returns none.
    pub fn first_tools_then_end(
        first_content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        second_content: impl Into<String>,
    ) -> Self {
        Self {
            content: first_content.into(),
            tool_calls,
            call_count: Some(AtomicUsize::new(0)),
            second_content: Some(second_content.into()),
            stream_by_char: AtomicBool::new(false),
            error: None,
        }
    }

    /// Always fails `invoke`/`invoke_stream` with `AgentError::ExecutionFailed(message)`.
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            tool_calls: vec![],
            call_count: None,
            second_content: None,
            stream_by_char: AtomicBool::new(false),
            error: Some(message.into()),
        }
    }

    pub fn with_stream_by_char(self) -> Self {
        self.stream_by_char.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, _messages: &[Message]) -> Result<LlmResponse, AgentError> {
        if let Some(ref message) = self.error {
            return Err(AgentError::ExecutionFailed(message.clone()));
        }
        let (content, tool_calls) = match &self.call_count {
            Some(c) => {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    (self.content.clone(), self.tool_calls.clone())
                } else {
                    (
                        self.second_content
                            .as_deref()
                            .unwrap_or(&self.content)
                            .to_string(),
                        vec![],
                    )
                }
            }
            None => (self.content.clone(), self.tool_calls.clone()),
        };
        Ok(LlmResponse {
            content,
            tool_calls,
            usage: None,
        })
    }

    async fn invoke_stream(
        &self,
        messages: &[Message],
        chunk_tx: Option<mpsc::Sender<MessageChunk>>,
    ) -> Result<LlmResponse, AgentError> {
        let response = self.invoke(messages).await?;

        if let Some(tx) = chunk_tx {
            if !response.content.is_empty() {
                if self.stream_by_char.load(Ordering::SeqCst) {
                    for c in response.content.chars() {
                        let _ = tx
                            .send(MessageChunk {
                                content: c.to_string(),
                            })
                            .await;
                    }
                } else {
                    let _ = tx
                        .send(MessageChunk {
                            content: response.content.clone(),
                        })
                        .await;
                }
            }
        }

        Ok(response)
    }
}
