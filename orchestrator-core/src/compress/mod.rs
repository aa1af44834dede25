//! Context compression: prune tool results and compact conversation history.
//!
//! Used inside a role's think/act/observe loop to stay within context limits via
//! pruning stale tool results and, when enabled, LLM summarization of older turns.

pub mod compact_node;
pub mod compaction;
pub mod config;
pub mod context_window;
pub mod graph;
pub mod prune_node;

pub use config::CompactionConfig;
pub use graph::{build_graph, CompressionGraphNode};
