//! Conversation compaction: prune old tool results and compact history via LLM summarization.
//!
//! Capabilities:
//! - **prune**: replace old `Tool` messages beyond a token limit with a placeholder.
//! - **compact**: summarize earlier messages into one System message via LLM, keep the
//!   most recent N as-is.

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::message::Message;

use super::config::CompactionConfig;
use super::context_window::estimate_tokens;

/// Placeholder text used to replace pruned tool results in messages.
pub const PRUNE_PLACEHOLDER: &str = "[Old tool result cleared]";

/// Replace old tool-result messages beyond the keep-token limit with a placeholder.
///
/// Walks messages from newest to oldest, accumulating tokens for `Tool` messages only.
/// Results that push the total over `prune_keep_tokens` are marked for pruning. If the
/// total prunable tokens would be less than `prune_minimum`, no change is made.
pub fn prune(messages: Vec<Message>, config: &CompactionConfig) -> Vec<Message> {
    if !config.prune || config.prune_keep_tokens == 0 {
        return messages;
    }
    let min = config.prune_minimum.unwrap_or(20_000);

    let mut total: u32 = 0;
    let mut pruned: u32 = 0;
    let mut to_prune = Vec::new();

    for (i, m) in messages.iter().enumerate().rev() {
        if matches!(m, Message::Tool { .. }) {
            let tok = estimate_tokens(std::slice::from_ref(m));
            total += tok;
            if total > config.prune_keep_tokens {
                pruned += tok;
                to_prune.push(i);
            }
        }
    }

    if pruned < min {
        return messages;
    }

    let mut out = messages;
    for i in to_prune {
        if let Some(Message::Tool {
            tool_call_id,
            timestamp,
            ..
        }) = out.get(i)
        {
            out[i] = Message::Tool {
                content: PRUNE_PLACEHOLDER.to_string(),
                tool_call_id: tool_call_id.clone(),
                timestamp: *timestamp,
            };
        }
    }
    out
}

/// Summarize earlier messages into one System message via LLM and keep the most recent
/// `compact_keep_recent` as-is.
pub async fn compact(
    messages: &[Message],
    llm: &dyn LlmClient,
    config: &CompactionConfig,
) -> Result<Vec<Message>, AgentError> {
    let keep = config.compact_keep_recent;
    if messages.len() <= keep {
        return Ok(messages.to_vec());
    }
    let split = messages.len().saturating_sub(keep);
    let (to_summarize, recent) = messages.split_at(split);

    let prompt = build_summary_prompt(to_summarize);
    let summary_msgs = vec![Message::user(prompt)];
    let response = llm.invoke(&summary_msgs).await?;

    let summary = Message::system(format!(
        "[Summary of earlier conversation]: {}",
        response.content
    ));
    let mut out = vec![summary];
    out.extend(recent.iter().cloned());
    Ok(out)
}

fn build_summary_prompt(msgs: &[Message]) -> String {
    let mut parts = vec![
        "Summarize the following conversation. Focus on:".to_string(),
        "- What was done".to_string(),
        "- What is being worked on".to_string(),
        "- Which files are involved".to_string(),
        "- What needs to be done next".to_string(),
        String::new(),
    ];
    for m in msgs {
        let role = match m {
            Message::System { .. } => "System",
            Message::User { .. } => "User",
            Message::Assistant { .. } => "Assistant",
            Message::Tool { .. } => "Tool",
        };
        parts.push(format!("{}: {}", role, m.content()));
    }
    parts.join("\n")
}
