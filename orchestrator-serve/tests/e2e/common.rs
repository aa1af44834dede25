//! Shared helpers for e2e tests. Received SSE payloads are logged with
//! `[e2e] received: ...`; run tests with `--nocapture` to see them.

use std::sync::Arc;
use std::time::Duration;

use orchestrator_core::memory::MemorySaver;
use orchestrator_core::{
    InMemoryApprovalTracker, MockLlm, MockToolSource, NoOpUserMessageStore, SqlxCheckpointStore,
};
use orchestrator_serve::state::{AppState, SessionCache};
use orchestrator_serve::ServeConfig;
use orchestrator_protocol::ProtocolEvent;
use tokio::net::TcpListener;

/// Loads .env from the current directory so local runs can supply overrides;
/// e2e tests never depend on a real LLM/tool provider being reachable.
pub fn load_dotenv() {
    let _ = dotenv::dotenv();
}

fn test_config(api_key: Option<&str>) -> ServeConfig {
    ServeConfig {
        api_key: api_key.map(str::to_string),
        db_url: String::new(), // overwritten by spawn_server with a per-test temp file
        llm_provider_url: None,
        llm_provider_key: None,
        llm_model_default: "mock".to_string(),
        tool_gateway_url: None,
        tool_loading_strategy: "progressive".to_string(),
        max_tools_per_request: 30,
        max_context_tokens: 128_000,
        max_response_tokens: 4_096,
        approval_deadline: Duration::from_secs(24 * 3600),
        approval_poll_interval: Duration::from_secs(30),
        approval_tracker_url: None,
        enable_intent_llm_fallback: false,
        keepalive_interval: Duration::from_secs(15),
        history_summarize_after_turns: 30,
        subtask_retry_budget: 2,
        retention_days: 30,
    }
}

/// Builds an [`AppState`] wired entirely to in-memory/mock collaborators: a
/// [`MockLlm`] replying with `llm_reply`, [`MockToolSource`] with no tools, an
/// in-process approval tracker, and a file-backed sqlite checkpoint store (a
/// bare `sqlite::memory:` DSN hands out a fresh empty database per pooled
/// connection, which breaks a store that's written on one connection and read
/// back on another).
pub async fn test_state(api_key: Option<&str>, llm_reply: &str) -> (AppState, tempfile::TempPath) {
    let db_file = tempfile::NamedTempFile::new().unwrap().into_temp_path();
    let db_url = format!("sqlite://{}?mode=rwc", db_file.display());
    let store = SqlxCheckpointStore::connect(&db_url).await.unwrap();

    let state = AppState {
        config: Arc::new(test_config(api_key)),
        llm: Arc::new(MockLlm::with_no_tool_calls(llm_reply)),
        tool_source: Arc::new(MockToolSource::new()),
        prompts: orchestrator_core::prompts::default_from_embedded(),
        checkpointer: Arc::new(MemorySaver::new()),
        store: Arc::new(store),
        user_messages: Arc::new(NoOpUserMessageStore),
        approval_tracker: Arc::new(InMemoryApprovalTracker::default()),
        sessions: Arc::new(SessionCache::new()),
    };
    (state, db_file)
}

/// Binds to a random loopback port and serves `state` until the returned
/// handle is dropped or aborted. Returns the base `http://` URL.
pub async fn spawn_server(
    state: AppState,
) -> (String, tokio::task::JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{addr}");
    let handle = tokio::spawn(orchestrator_serve::run_serve_on_listener(state, listener));
    (url, handle)
}

/// Reads an SSE response body to completion, splitting on blank lines and
/// parsing each `data: <json>` line into a [`ProtocolEvent`]. `: keepalive`
/// comment lines are skipped; none should appear in these short-lived tests.
pub async fn read_sse_events(response: reqwest::Response) -> Vec<ProtocolEvent> {
    use futures_util::StreamExt;

    let mut events = Vec::new();
    let mut buf = String::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.expect("reading SSE chunk");
        buf.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buf.find("\n\n") {
            let frame = buf[..pos].to_string();
            buf.drain(..pos + 2);
            for line in frame.lines() {
                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };
                eprintln!("[e2e] received: {data}");
                let event: ProtocolEvent = serde_json::from_str(data).unwrap_or_else(|e| {
                    panic!("failed to parse SSE payload {data:?}: {e}")
                });
                events.push(event);
            }
        }
    }
    events
}
