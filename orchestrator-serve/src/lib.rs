//! HTTP/SSE front door (§4.1): routes chat and workflow-execute requests from
//! editor extensions into the orchestration core and streams results back.
//!
//! [`run_serve`] is the binary entry point; [`router`] builds the `axum::Router`
//! on its own so tests can drive it in-process with `tower::ServiceExt::oneshot`
//! without binding a socket.

pub mod auth;
pub mod config;
pub mod errors;
pub mod request_id;
pub mod routes;
pub mod sse;
pub mod state;
pub mod workflow_bridge;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderName;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use orchestrator_core::memory::MemorySaver;
use orchestrator_core::{
    prompts, ApprovalTracker, ChatOpenAI, HttpApprovalTracker, InMemoryApprovalTracker, LlmClient,
    SqliteUserMessageStore, SqlxCheckpointStore, ToolSource, UserMessageStore,
};
use tracing::warn;

use routes::approval::apply_decision_and_maybe_resume;
use routes::resume::load_and_apply;

pub use config::ServeConfig;
pub use state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Assembles the router: public routes first, then everything behind the API
/// key middleware. `health` is added after the auth layer is applied to the
/// rest, so it never passes through `require_api_key` (§4.1: "health and metrics
/// endpoints are exempt").
pub fn router(state: AppState) -> Router {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let protected = Router::new()
        .route("/chat", post(routes::chat::chat))
        .route("/execute", post(routes::execute::execute))
        .route("/resume", post(routes::resume::resume))
        .route("/workflows/:workflow_id", get(routes::status::get_status))
        .route("/approvals/decision", post(routes::approval::submit_decision))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    header_name.clone(),
                    request_id::MakeOrchestratorRequestId,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(header_name)),
        )
        .with_state(state)
}

/// Builds [`AppState`] from [`ServeConfig`], wiring up real collaborators: an
/// OpenAI-compatible LLM client, the SQL-backed checkpoint store, and the
/// in-memory approval tracker fake (a `reqwest`-based tracker is used instead
/// once `APPROVAL_TRACKER_URL` is configured for a real deployment).
///
/// The graph engine's own resumable-checkpoint mechanics use an in-process
/// `MemorySaver` rather than the durable store directly — `SqlxCheckpointStore`
/// isn't a `Checkpointer<WorkflowState>` (see [`crate::state::AppState`]); this is
/// an accepted scoping gap, not an oversight, and loses in-flight suspensions
/// across a process restart until the two stores are unified.
pub async fn build_state(config: ServeConfig) -> Result<AppState, BoxError> {
    let llm: Arc<dyn LlmClient> = Arc::new(ChatOpenAI::new(config.llm_model_default.clone()));

    let tool_source: Arc<dyn ToolSource> = match &config.tool_gateway_url {
        Some(url) => Arc::new(
            orchestrator_core::tool_source::McpToolSource::new_http(
                url.clone(),
                Vec::<(String, String)>::new(),
            )
            .await?,
        ),
        None => Arc::new(orchestrator_core::tool_source::MockToolSource::new()),
    };

    let approval_tracker: Arc<dyn ApprovalTracker> = match &config.approval_tracker_url {
        Some(url) => Arc::new(HttpApprovalTracker::new(url.clone())),
        None => Arc::new(InMemoryApprovalTracker::default()),
    };

    let prompts = prompts::load_or_default(None);
    let store = Arc::new(SqlxCheckpointStore::connect(&config.db_url).await?);
    let user_messages: Arc<dyn UserMessageStore> =
        Arc::new(SqliteUserMessageStore::new(&config.user_message_db_path)?);

    Ok(AppState {
        config: Arc::new(config),
        llm,
        tool_source,
        prompts,
        checkpointer: Arc::new(MemorySaver::new()),
        store,
        user_messages,
        approval_tracker,
        sessions: Arc::new(state::SessionCache::new()),
    })
}

/// Binds a TCP listener at `addr` and serves until the process is signaled to
/// stop. `ConnectInfo` is required by the auth middleware's client-address
/// logging, so the service is wrapped with `into_make_service_with_connect_info`
/// rather than plain `into_make_service`.
pub async fn run_serve(config: ServeConfig, addr: SocketAddr) -> Result<(), BoxError> {
    let state = build_state(config).await?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    run_serve_on_listener(state, listener).await
}

/// One sweep of the polling-fallback decision path (§4.8 item 3(b)): lists every
/// workflow the store considers awaiting approval, and for each one still
/// undecided, asks the tracker whether a decision has landed since the last
/// sweep. A decision found this way is applied through the same path the
/// `/approvals/decision` webhook uses, so both ingress paths behave
/// identically. Runs alongside the webhook route rather than instead of it —
/// the webhook is the fast path, this is the fallback for trackers that can't
/// push.
async fn poll_pending_approvals(state: &AppState) {
    let workflow_ids = match state.store.list_awaiting_approval().await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "approval poll: failed to list awaiting-approval workflows");
            return;
        }
    };

    for workflow_id in workflow_ids {
        let wf_state = match load_and_apply(state, workflow_id.as_str(), None).await {
            Ok(Some(s)) => s,
            Ok(None) => continue,
            Err(e) => {
                warn!(workflow_id = %workflow_id.as_str(), error = %e.0, "approval poll: failed to load workflow");
                continue;
            }
        };
        let Some(approval) = wf_state.approval.as_ref() else {
            continue;
        };
        if approval.decision.is_some() {
            continue;
        }
        let approval_id = approval.id.clone();

        match state.approval_tracker.poll_decision(&approval_id).await {
            Ok(Some(event)) => {
                if let Err(e) =
                    apply_decision_and_maybe_resume(state, workflow_id.as_str(), event).await
                {
                    warn!(
                        workflow_id = %workflow_id.as_str(),
                        approval_id = %approval_id,
                        error = %e.0,
                        "approval poll: failed to apply polled decision",
                    );
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    workflow_id = %workflow_id.as_str(),
                    approval_id = %approval_id,
                    error = %e,
                    "approval poll: tracker poll failed",
                );
            }
        }
    }
}

/// Spawns the polling-fallback loop on `state.config.approval_poll_interval`
/// (`APPROVAL_POLL_SECONDS`, default 30s). Runs for the lifetime of the
/// process; there is no shutdown handle because the service itself has none.
pub fn spawn_approval_poll_loop(state: AppState) {
    let interval = state.config.approval_poll_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            poll_pending_approvals(&state).await;
        }
    });
}

pub async fn run_serve_on_listener(
    state: AppState,
    listener: tokio::net::TcpListener,
) -> Result<(), BoxError> {
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "orchestrator-serve listening");
    spawn_approval_poll_loop(state.clone());
    let app = router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
