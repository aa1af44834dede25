//! State graph: nodes + linear/conditional edges, compile and invoke.
//!
//! `StateGraph`: register nodes and edges, `compile()`, then `invoke`/`stream`.

mod checkpoint_types;
mod checkpointer_trait;
mod compile_error;
mod compiled;
mod conditional;
mod interrupt;
mod logging;
mod logging_middleware;
mod name_node;
mod next;
mod node;
mod node_middleware;
mod retry;
mod run_context;
mod runnable_config;
mod runtime;
mod state_graph;
mod store;
mod visualization;

pub use checkpoint_types::{
    writes_idx_map, ChannelVersions, Checkpoint, CheckpointListItem, CheckpointMetadata,
    CheckpointSource, CheckpointTuple, PendingWrite, CHECKPOINT_VERSION, ERROR, INTERRUPT, RESUME,
    SCHEDULED,
};
pub use checkpointer_trait::{CheckpointError, Checkpointer};
pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use interrupt::{DefaultInterruptHandler, GraphInterrupt, Interrupt, InterruptHandler};
pub use logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
    log_node_state, log_state_update,
};
pub use logging_middleware::LoggingNodeMiddleware;
pub use name_node::NameNode;
pub use next::Next;
pub use node::Node;
pub use node_middleware::NodeMiddleware;
pub use retry::RetryPolicy;
pub use run_context::RunContext;
pub use runnable_config::RunnableConfig;
pub use runtime::Runtime;
pub use state_graph::{StateGraph, END, START};
pub use store::{Item, MatchCondition, Namespace, NamespaceMatchType, Store, StoreError};
pub use visualization::{generate_dot, generate_text};
