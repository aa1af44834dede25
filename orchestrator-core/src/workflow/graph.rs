//! Builds the workflow graph: `delegate_task`, `execute_task`, `agent_executor`,
//! `analyze_results`, `decide_next` (conditional), `approval_gate`, `handle_error`,
//! `finalize_workflow`.

use std::sync::Arc;

use crate::graph::{CompilationError, CompiledStateGraph, Checkpointer, StateGraph, END, START};
use crate::llm::LlmClient;
use crate::prompts::RolePrompts;
use crate::state::{AgentRole, WorkflowState};
use crate::tool_source::ToolSource;

use super::executor::AgentExecutorNode;
use super::nodes::{
    decide_next, AnalyzeResultsNode, ApprovalGateNode, DecideNextNode, DelegateTaskNode,
    ExecuteTaskNode, FinalizeWorkflowNode, HandleErrorNode,
};

/// Collaborators the workflow graph's nodes are built from.
pub struct WorkflowGraphConfig {
    pub llm: Arc<dyn LlmClient>,
    pub tool_source: Arc<dyn ToolSource>,
    pub prompts: RolePrompts,
}

fn add_nodes(graph: &mut StateGraph<WorkflowState>, config: WorkflowGraphConfig) {
    let supervisor_prompt = config.prompts.system_prompt(AgentRole::Supervisor).to_string();

    graph.add_node(
        "delegate_task",
        Arc::new(DelegateTaskNode {
            llm: config.llm.clone(),
            system_prompt: supervisor_prompt,
        }),
    );
    graph.add_node("execute_task", Arc::new(ExecuteTaskNode));
    graph.add_node(
        "agent_executor",
        Arc::new(AgentExecutorNode {
            llm: config.llm,
            tool_source: config.tool_source,
            prompts: config.prompts,
        }),
    );
    graph.add_node("analyze_results", Arc::new(AnalyzeResultsNode));
    graph.add_node("decide_next", Arc::new(DecideNextNode));
    graph.add_node("approval_gate", Arc::new(ApprovalGateNode));
    graph.add_node("handle_error", Arc::new(HandleErrorNode::default()));
    graph.add_node("finalize_workflow", Arc::new(FinalizeWorkflowNode));
}

fn add_edges(graph: &mut StateGraph<WorkflowState>) {
    graph
        .add_edge(START, "delegate_task")
        // Every other node returns an explicit `Next::Node`/`Next::End`; this edge only
        // satisfies compile()'s "graph has an edge to END" check.
        .add_edge("finalize_workflow", END);
    graph.add_conditional_edges(
        "decide_next",
        Arc::new(|s: &WorkflowState| decide_next(s)),
        None,
    );
}

/// Builds the uncheckpointed workflow graph (tests, one-shot runs).
pub fn build_workflow_graph(
    config: WorkflowGraphConfig,
) -> Result<CompiledStateGraph<WorkflowState>, CompilationError> {
    let mut graph = StateGraph::<WorkflowState>::new();
    add_nodes(&mut graph, config);
    add_edges(&mut graph);
    graph.compile()
}

/// Builds the workflow graph with a durable checkpointer, so an interrupted run's
/// state is persisted at the point of suspension and can be resumed later via
/// `RunnableConfig::resume_from_node_id`.
pub fn build_workflow_graph_with_checkpointer(
    config: WorkflowGraphConfig,
    checkpointer: Arc<dyn Checkpointer<WorkflowState>>,
) -> Result<CompiledStateGraph<WorkflowState>, CompilationError> {
    let mut graph = StateGraph::<WorkflowState>::new();
    add_nodes(&mut graph, config);
    add_edges(&mut graph);
    graph.compile_with_checkpointer(checkpointer)
}
