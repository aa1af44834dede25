//! Compact node: when config.auto and context overflows, summarizes old messages via LLM.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::LlmClient;
use crate::state::ReActState;

use super::compaction;
use super::config::CompactionConfig;
use super::context_window;

/// Node that compacts conversation history when context overflows (config.auto).
pub struct CompactNode {
    pub config: CompactionConfig,
    pub llm: Arc<dyn LlmClient>,
}

#[async_trait]
impl Node<ReActState> for CompactNode {
    fn id(&self) -> &str {
        "compact"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let overflow_input = context_window::ContextWindowCheck {
            messages: &state.messages,
            max_context_tokens: self.config.max_context_tokens,
            reserve_tokens: self.config.reserve_tokens,
        };
        let messages = if self.config.auto && context_window::is_overflow(&overflow_input) {
            compaction::compact(&state.messages, self.llm.as_ref(), &self.config).await?
        } else {
            state.messages
        };
        Ok((ReActState { messages, ..state }, Next::Continue))
    }
}
