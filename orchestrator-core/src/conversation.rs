//! The single-turn conversational path: one LLM call with a small tool profile bound,
//! at most one tool-execution round trip, response streamed token-by-token.
//!
//! Unlike the workflow graph, this handler is not a [`crate::graph::Node`] — it never
//! suspends, has no durable checkpoint, and its only state is the session history the
//! caller passes in and gets back.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::{AgentError, OrchestratorError};
use crate::llm::{LlmClient, LlmUsage};
use crate::message::Message;
use crate::state::ToolCall;
use crate::stream::MessageChunk;
use crate::tool_source::ToolSource;

/// Default number of prior turns kept from session history (§4.3: K = 10).
pub const DEFAULT_HISTORY_TURNS: usize = 10;
/// Default cap on total bytes of attached file content folded into the prompt.
pub const DEFAULT_MAX_FILE_BYTES: usize = 64 * 1024;

/// Input to one conversational turn.
pub struct ConversationalTurn {
    pub message: String,
    /// Prior turns, oldest first; only the last `history_turns` are kept.
    pub history: Vec<Message>,
    pub history_turns: usize,
    /// Attached file contents, already read; each is truncated to fit `max_file_bytes`
    /// in aggregate, dropping the latest files first.
    pub files: Vec<(String, String)>,
    pub max_file_bytes: usize,
}

impl ConversationalTurn {
    pub fn new(message: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            message: message.into(),
            history,
            history_turns: DEFAULT_HISTORY_TURNS,
            files: Vec::new(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

/// Result of a completed turn: the full updated history (ready to persist atomically)
/// and the final assistant reply.
pub struct ConversationalOutcome {
    pub history: Vec<Message>,
    pub reply: String,
    pub usage: Option<LlmUsage>,
}

fn cap_file_bytes(files: &[(String, String)], max_bytes: usize) -> String {
    let mut used = 0usize;
    let mut rendered = String::new();
    for (name, content) in files {
        if used >= max_bytes {
            break;
        }
        let remaining = max_bytes - used;
        let slice: String = content.chars().take(remaining).collect();
        used += slice.len();
        rendered.push_str(&format!("\n--- {name} ---\n{slice}\n"));
    }
    rendered
}

fn build_messages(turn: &ConversationalTurn) -> Vec<Message> {
    let history_start = turn.history.len().saturating_sub(turn.history_turns);
    let mut messages: Vec<Message> = turn.history[history_start..].to_vec();

    let content = if turn.files.is_empty() {
        turn.message.clone()
    } else {
        format!(
            "{}\n{}",
            turn.message,
            cap_file_bytes(&turn.files, turn.max_file_bytes)
        )
    };
    messages.push(Message::user(content));
    messages
}

async fn run_tool_calls(
    tool_source: &Arc<dyn ToolSource>,
    calls: &[ToolCall],
) -> Vec<Message> {
    let mut out = Vec::with_capacity(calls.len());
    for call in calls {
        let call_id = call.id.clone().unwrap_or_else(|| call.name.clone());
        let arguments: serde_json::Value =
            serde_json::from_str(&call.arguments).unwrap_or_else(|_| {
                serde_json::Value::String(call.arguments.clone())
            });
        let content = match tool_source.call_tool(&call.name, arguments).await {
            Ok(result) => result.text,
            Err(e) => format!("tool error: {e}"),
        };
        out.push(Message::tool(content, call_id));
    }
    out
}

/// Runs one conversational turn: a single LLM call with `tool_source`'s tools
/// available, followed by at most one tool round-trip, streaming the final reply's
/// tokens through `chunk_tx` as they arrive.
///
/// Returns [`OrchestratorError::Unavailable`] (wrapped in [`AgentError::ExecutionFailed`])
/// if the LLM or a tool call permanently errors; callers are expected to still emit a
/// graceful final SSE frame from that error before closing the stream, per the contract
/// that the graph engine itself follows for node failures.
pub async fn handle_conversational_turn(
    turn: ConversationalTurn,
    llm: Arc<dyn LlmClient>,
    tool_source: Arc<dyn ToolSource>,
    chunk_tx: Option<mpsc::Sender<MessageChunk>>,
) -> Result<ConversationalOutcome, AgentError> {
    let mut messages = build_messages(&turn);

    // Whether this call's content is worth streaming depends on whether it carries
    // tool calls, which isn't known until it returns; stream it only once resolved.
    let first = llm
        .invoke(&messages)
        .await
        .map_err(|e| {
            AgentError::from(OrchestratorError::Unavailable(format!(
                "conversational LLM call failed: {e}"
            )))
        })?;

    if first.tool_calls.is_empty() {
        stream_full_content(&chunk_tx, &first.content).await;
        messages.push(Message::assistant(first.content.clone()));
        return Ok(ConversationalOutcome {
            history: messages,
            reply: first.content,
            usage: first.usage,
        });
    }

    let tool_message_calls: Vec<crate::message::ToolCall> = first
        .tool_calls
        .iter()
        .enumerate()
        .map(|(i, c)| crate::message::ToolCall {
            id: c.id.clone().unwrap_or_else(|| format!("call-{i}")),
            name: c.name.clone(),
            arguments: serde_json::from_str(&c.arguments)
                .unwrap_or_else(|_| serde_json::Value::String(c.arguments.clone())),
        })
        .collect();
    messages.push(Message::assistant_with_tool_calls(
        first.content.clone(),
        tool_message_calls,
    ));
    messages.extend(run_tool_calls(&tool_source, &first.tool_calls).await);

    let second = llm
        .invoke_stream(&messages, chunk_tx)
        .await
        .map_err(|e| {
            AgentError::from(OrchestratorError::Unavailable(format!(
                "conversational LLM follow-up call failed: {e}"
            )))
        })?;

    messages.push(Message::assistant(second.content.clone()));
    Ok(ConversationalOutcome {
        history: messages,
        reply: second.content,
        usage: second.usage.or(first.usage),
    })
}

async fn stream_full_content(chunk_tx: &Option<mpsc::Sender<MessageChunk>>, content: &str) {
    if let Some(tx) = chunk_tx {
        if !content.is_empty() {
            let _ = tx
                .send(MessageChunk {
                    content: content.to_string(),
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use crate::tool_source::{MockToolSource, ToolSpec};

    #[tokio::test]
    async fn plain_reply_with_no_tool_calls_is_streamed_and_appended() {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::with_no_tool_calls("hello there"));
        let tool_source: Arc<dyn ToolSource> = Arc::new(MockToolSource::new());
        let turn = ConversationalTurn::new("hi", Vec::new());
        let out = handle_conversational_turn(turn, llm, tool_source, None)
            .await
            .unwrap();
        assert_eq!(out.reply, "hello there");
        assert_eq!(out.history.len(), 2);
    }

    #[tokio::test]
    async fn history_window_is_capped_to_history_turns() {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::with_no_tool_calls("ok"));
        let tool_source: Arc<dyn ToolSource> = Arc::new(MockToolSource::new());
        let history: Vec<Message> = (0..20).map(|i| Message::user(format!("turn {i}"))).collect();
        let mut turn = ConversationalTurn::new("latest", history);
        turn.history_turns = 3;
        let out = handle_conversational_turn(turn, llm, tool_source, None)
            .await
            .unwrap();
        // 3 kept history turns + the new user message + the assistant reply.
        assert_eq!(out.history.len(), 5);
    }

    #[tokio::test]
    async fn file_contents_are_folded_into_the_user_message_within_the_byte_cap() {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::with_no_tool_calls("ok"));
        let tool_source: Arc<dyn ToolSource> = Arc::new(MockToolSource::new());
        let mut turn = ConversationalTurn::new("summarize", Vec::new());
        turn.files = vec![("a.rs".to_string(), "x".repeat(1000))];
        turn.max_file_bytes = 10;
        let out = handle_conversational_turn(turn, llm, tool_source, None)
            .await
            .unwrap();
        let user_msg = &out.history[0];
        assert!(user_msg.content().len() < 1000);
    }

    #[tokio::test]
    async fn tool_calls_trigger_exactly_one_round_trip_then_a_final_reply() {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::first_tools_then_end(
            "let me check the file",
            vec![ToolCall {
                name: "fs.read".to_string(),
                arguments: "{}".to_string(),
                id: Some("call-1".to_string()),
            }],
            "the file contains file contents",
        ));
        let tool_source: Arc<dyn ToolSource> = Arc::new(
            MockToolSource::new().with_tool(
                ToolSpec {
                    name: "fs.read".into(),
                    description: None,
                    input_schema: serde_json::json!({}),
                },
                "file contents",
            ),
        );
        let turn = ConversationalTurn::new("what's in the file", Vec::new());
        let out = handle_conversational_turn(turn, llm, tool_source, None)
            .await
            .unwrap();
        assert_eq!(out.reply, "the file contains file contents");
        assert!(out
            .history
            .iter()
            .any(|m| matches!(m, Message::Tool { .. })));
    }

    #[tokio::test]
    async fn llm_failure_surfaces_as_execution_failed() {
        let llm: Arc<dyn LlmClient> = Arc::new(MockLlm::with_error("down"));
        let tool_source: Arc<dyn ToolSource> = Arc::new(MockToolSource::new());
        let turn = ConversationalTurn::new("hi", Vec::new());
        let err = handle_conversational_turn(turn, llm, tool_source, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed(_)));
    }
}
