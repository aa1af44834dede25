//! # orchestrator-core
//!
//! Orchestration core for a multi-agent developer-assistance service: a durable,
//! resumable workflow graph that routes a request through intent classification,
//! delegates subtasks to one of six specialized agent roles, and pauses at
//! human-in-the-loop approval gates for anything risky.
//!
//! ## Design principles
//!
//! - **Single state type**: the workflow graph threads one [`WorkflowState`] through
//!   every node; a role's own think/act/observe loop threads a smaller [`ReActState`].
//! - **State graphs**: [`StateGraph`] compiles to [`CompiledStateGraph`], with
//!   conditional routing, retry policies, and interrupt-driven approval gates.
//! - **Event-sourced durability**: [`SqlxCheckpointStore`] persists the append-only
//!   event log and periodic state snapshots a resumed run folds from.
//! - **Six fixed roles**: Supervisor, FeatureDev, CodeReview, Infrastructure, Cicd,
//!   Documentation ([`AgentRole`]), each with one embedded system prompt
//!   ([`prompts`]) instead of a pluggable reasoning strategy.
//! - **Tool access via MCP**: nodes depend on the [`ToolSource`] trait; the only
//!   production implementation is [`McpToolSource`] (stdio or Streamable HTTP).
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`Next`], [`RunContext`],
//!   [`Checkpointer`], [`Store`] — build and run state graphs.
//! - [`state`]: [`WorkflowState`], [`Event`], [`EventKind`], [`SubTask`], [`Approval`],
//!   [`AgentRole`], [`ReActState`] — durable and scratch data model.
//! - [`message`]: [`Message`], [`ToolCall`], [`ToolResult`] — conversation history.
//! - [`error`]: [`AgentError`] (node-level), [`OrchestratorError`] (outward-facing taxonomy).
//! - [`ids`]: [`WorkflowId`], [`SessionId`] — time-ordered opaque identifiers.
//! - [`llm`]: [`LlmClient`] trait, [`MockLlm`], [`ChatOpenAI`].
//! - [`memory`]: [`MemorySaver`] (generic `Checkpointer` for dev/tests), [`SqlxCheckpointStore`]
//!   (durable event-sourced store), [`InMemoryStore`] (non-authoritative `Store` accelerator).
//! - [`user_message`]: [`UserMessageStore`] — full ordered message history per thread.
//! - [`tool_source`]: [`ToolSource`], [`McpToolSource`], [`MockToolSource`].
//! - [`prompts`]: per-[`AgentRole`] system prompt loading (embedded defaults, directory
//!   and env overrides).
//! - [`compress`]: context-window pruning and LLM-summarized compaction for a role's
//!   scratch conversation.
//! - [`stream`]: [`StreamWriter`], [`StreamEvent`], [`StreamMode`] for graph runs.
//! - [`runner_common`]: shared stream-consumption and checkpoint-or-build helpers used
//!   by the workflow node runners.
//! - [`intent`]: [`classify`] — deterministic routing from a raw message to the
//!   conversational handler or the workflow graph, with an optional LLM fallback.
//! - [`conversation`]: [`handle_conversational_turn`] — the single-LLM-call,
//!   at-most-one-tool-round-trip fast path the classifier routes `QA`/`SIMPLE_TASK`
//!   messages to.
//! - [`tool_loader`]: [`select_tools`] — ranks and caps a [`ToolCatalog`] down to the
//!   handful of tools bound to one LLM call, under one of four named strategies.
//! - [`workflow`]: the canonical graph nodes ([`build_workflow_graph`]) and the
//!   per-role [`RoleConfig`] table the shared [`AgentExecutorNode`] runs against.
//! - [`hitl`]: [`ApprovalTracker`], [`record_decision`] — mirrors a pending approval to
//!   an external system and applies its decision back onto a loaded [`WorkflowState`].
//!
//! Key types are re-exported at crate root: `use orchestrator_core::{StateGraph, Message, WorkflowState};`.

pub mod channels;
pub mod compress;
pub mod conversation;
pub mod error;
pub mod graph;
pub mod hitl;
pub mod ids;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod message;
pub mod prompts;
pub mod runner_common;
pub mod state;
pub mod stream;
pub mod tool_loader;
pub mod tool_source;
pub mod user_message;
pub mod workflow;

pub use channels::{
    boxed_updater, BoxedStateUpdater, ChannelError, EphemeralValue, FieldBasedUpdater,
    NamedBarrierUpdate, NamedBarrierValue, ReplaceUpdater, StateUpdater,
};
pub use compress::{build_graph as build_compression_graph, CompactionConfig, CompressionGraphNode};
pub use conversation::{
    handle_conversational_turn, ConversationalOutcome, ConversationalTurn,
    DEFAULT_HISTORY_TURNS, DEFAULT_MAX_FILE_BYTES,
};
pub use error::{AgentError, OrchestratorError};
pub use graph::{
    generate_dot, generate_text, log_graph_complete, log_graph_error, log_graph_start,
    log_node_complete, log_node_start, log_node_state, log_state_update, CheckpointError,
    Checkpointer, CompilationError, CompiledStateGraph, DefaultInterruptHandler, GraphInterrupt,
    Interrupt, InterruptHandler, LoggingNodeMiddleware, NameNode, Next, Node, NodeMiddleware,
    RetryPolicy, RunContext, RunnableConfig, Runtime, StateGraph, Store, StoreError, END, START,
};
pub use hitl::{
    is_expired, record_decision, ApprovalDecisionEvent, ApprovalRequest, ApprovalTracker,
    DecisionOutcome, HttpApprovalTracker, InMemoryApprovalTracker, TrackerError,
    DEFAULT_APPROVAL_DEADLINE_MS, DEFAULT_POLL_INTERVAL_SECS,
};
pub use ids::{uuid6, SessionId, Uuid6, WorkflowId};
pub use intent::{
    classify, classify_with_llm_fallback, ClassifierFlags, Classification, Command, Intent,
    LlmClassification, RoutingMode,
};
pub use llm::{ChatOpenAI, LlmClient, LlmResponse, LlmUsage, MockLlm, ToolChoiceMode};
pub use memory::{
    CheckpointStoreError, InMemoryStore, MemorySaver, ReplaySummary, SqlxCheckpointStore,
    WorkflowSummary,
};
pub use message::{Message, ToolCall as MessageToolCall, ToolResult as MessageToolResult, ToolStatus};
pub use prompts::{
    default_from_embedded as default_role_prompts, load as load_role_prompts,
    load_or_default as load_role_prompts_or_default, LoadError as PromptsLoadError, RolePrompts,
};
pub use runner_common::{load_from_checkpoint_or_build, run_stream_with_config, StreamEndedWithoutState};
pub use state::{
    AgentRole, Approval, ApprovalDecision, Event, EventKind, Insight, ReActState, RiskLevel,
    SubTask, SubTaskStatus, ToolCall, ToolResult, WorkflowState, WorkflowStatus,
};
pub use stream::{
    CheckpointEvent, MessageChunk, StreamEvent, StreamMetadata, StreamMode, StreamWriter,
    ToolStreamWriter,
};
pub use tool_loader::{
    select_tools, LibraryIdentifierCache, LoaderConfig, SelectedTool, SelectionRequest, Strategy,
    ToolCatalog, ToolDescriptor, ToolLoadWarning,
};
pub use tool_source::{
    McpHttpSession, McpSession, McpSessionError, McpToolSource, MockToolSource, ToolCallContent,
    ToolCallContext, ToolSource, ToolSourceError, ToolSpec,
};
pub use user_message::{
    NoOpUserMessageStore, SqliteUserMessageStore, UserMessageStore, UserMessageStoreError,
};
pub use workflow::{
    build_workflow_graph, role_config, AgentExecutorNode, AnalyzeResultsNode, ApprovalGateNode,
    DelegateTaskNode, ExecuteTaskNode, FinalizeWorkflowNode, HandleErrorNode, OutputMode,
    RoleConfig, WorkflowGraphConfig,
};
