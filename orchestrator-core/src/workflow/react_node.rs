//! The per-role think/act loop: `think` calls the LLM with the role's bound tools,
//! `act` executes any tool calls it produced and loops back to `think`. This is the
//! nested graph [`executor::AgentExecutorNode`](super::executor::AgentExecutorNode)
//! runs once per dispatched subtask.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::graph::{CompilationError, CompiledStateGraph, Next, Node, StateGraph, START};
use crate::llm::LlmClient;
use crate::message::{Message, ToolCall as MessageToolCall};
use crate::state::{ReActState, ToolCall, ToolResult};
use crate::tool_source::ToolSource;

fn parse_arguments(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn to_message_tool_call(call: &ToolCall, fallback_id: usize) -> MessageToolCall {
    MessageToolCall {
        id: call
            .id
            .clone()
            .unwrap_or_else(|| format!("call-{fallback_id}")),
        name: call.name.clone(),
        arguments: parse_arguments(&call.arguments),
    }
}

/// Calls the LLM with the scratch conversation so far; stops the loop once the
/// reply carries no further tool calls or `max_turns` is reached.
pub struct ThinkNode {
    pub llm: Arc<dyn LlmClient>,
    pub max_turns: u32,
}

#[async_trait]
impl Node<ReActState> for ThinkNode {
    fn id(&self) -> &str {
        "think"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        if state.turn_count >= self.max_turns {
            return Ok((state, Next::End));
        }

        let response = self.llm.invoke(&state.messages).await?;
        let mut messages = state.messages;
        let tool_message_calls: Vec<MessageToolCall> = response
            .tool_calls
            .iter()
            .enumerate()
            .map(|(i, c)| to_message_tool_call(c, i))
            .collect();
        if tool_message_calls.is_empty() {
            messages.push(Message::assistant(response.content));
        } else {
            messages.push(Message::assistant_with_tool_calls(
                response.content,
                tool_message_calls,
            ));
        }

        let next = if response.tool_calls.is_empty() {
            Next::End
        } else {
            Next::Node("act".to_string())
        };

        Ok((
            ReActState {
                messages,
                tool_calls: response.tool_calls,
                turn_count: state.turn_count + 1,
                usage: response.usage.clone(),
                total_usage: response.usage,
                ..Default::default()
            },
            next,
        ))
    }
}

/// Executes every tool call `think` produced, appends a `Tool` message per result,
/// then loops back to `think`.
pub struct ActNode {
    pub tool_source: Arc<dyn ToolSource>,
}

#[async_trait]
impl Node<ReActState> for ActNode {
    fn id(&self) -> &str {
        "act"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let mut messages = state.messages;
        let mut results = Vec::with_capacity(state.tool_calls.len());

        for (i, call) in state.tool_calls.iter().enumerate() {
            let call_id = call.id.clone().unwrap_or_else(|| format!("call-{i}"));
            let arguments = parse_arguments(&call.arguments);
            let outcome = self.tool_source.call_tool(&call.name, arguments).await;
            let content = match outcome {
                Ok(content) => content.text,
                Err(e) => format!("tool error: {e}"),
            };
            messages.push(Message::tool(content.clone(), call_id.clone()));
            results.push(ToolResult {
                call_id: Some(call_id),
                name: Some(call.name.clone()),
                content,
            });
        }

        Ok((
            ReActState {
                messages,
                tool_calls: Vec::new(),
                tool_results: results,
                turn_count: state.turn_count,
                usage: state.usage,
                total_usage: state.total_usage,
                approval_result: state.approval_result,
            },
            Next::Node("think".to_string()),
        ))
    }
}

/// Builds the think → act → think loop: `START → think`, `act → think`, `think` ends
/// the loop itself (`Next::End`) once there are no more tool calls or `max_turns` is hit.
pub fn build_react_graph(
    llm: Arc<dyn LlmClient>,
    tool_source: Arc<dyn ToolSource>,
    max_turns: u32,
) -> Result<CompiledStateGraph<ReActState>, CompilationError> {
    let think = Arc::new(ThinkNode {
        llm,
        max_turns,
    });
    let act = Arc::new(ActNode { tool_source });

    let mut graph = StateGraph::<ReActState>::new();
    graph
        .add_node("think", think)
        .add_node("act", act)
        .add_edge(START, "think")
        .add_edge("think", crate::graph::END)
        .add_edge("act", "think");
    // "think" always returns an explicit Next::Node("act") or Next::End at runtime;
    // the edge to END above only satisfies compile()'s "has an edge to END" check.
    graph.compile()
}
