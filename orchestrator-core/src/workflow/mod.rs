//! The workflow graph: canonical nodes over [`crate::state::WorkflowState`], the
//! per-role executor that runs a nested think/act loop, and the graph builder that
//! wires them together.
//!
//! Nodes: [`nodes::DelegateTaskNode`], [`nodes::ExecuteTaskNode`],
//! [`executor::AgentExecutorNode`], [`nodes::AnalyzeResultsNode`],
//! [`nodes::DecideNextNode`], [`nodes::ApprovalGateNode`], [`nodes::HandleErrorNode`],
//! [`nodes::FinalizeWorkflowNode`]. [`graph::build_workflow_graph`] wires them into a
//! [`crate::graph::CompiledStateGraph<WorkflowState>`].

pub mod executor;
pub mod graph;
pub mod nodes;
pub mod react_node;
pub mod roles;

pub use executor::AgentExecutorNode;
pub use graph::{build_workflow_graph, WorkflowGraphConfig};
pub use nodes::{
    decide_next, AnalyzeResultsNode, ApprovalGateNode, DelegateTaskNode, ExecuteTaskNode,
    FinalizeWorkflowNode, HandleErrorNode,
};
pub use roles::{role_config, OutputMode, RoleConfig};
