//! Prune node: runs [`super::compaction::prune`] on state.messages when config.prune is true.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::state::ReActState;

use super::compaction;
use super::config::CompactionConfig;

/// Node that prunes old tool results from messages when `config.prune` is true.
pub struct PruneNode {
    pub config: CompactionConfig,
}

#[async_trait]
impl Node<ReActState> for PruneNode {
    fn id(&self) -> &str {
        "prune"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let messages = if self.config.prune {
            compaction::prune(state.messages, &self.config)
        } else {
            state.messages
        };
        Ok((ReActState { messages, ..state }, Next::Continue))
    }
}
