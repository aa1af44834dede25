//! Process-start configuration, loaded once from the environment (§4.10/§6).
//!
//! `ServeConfig::from_env` is the only place that reads `std::env::var`; everything
//! downstream takes the slice of config it needs instead of reaching for the
//! environment directly.

use std::time::Duration;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Immutable, process-wide configuration. Constructed once in `main`/`run_serve`
/// and shared behind an `Arc` in [`crate::state::AppState`].
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Single shared API key; `None` disables auth (local dev only, §4.1).
    pub api_key: Option<String>,
    pub db_url: String,
    /// SQLite file backing the durable per-thread [`orchestrator_core::UserMessageStore`].
    pub user_message_db_path: String,
    pub llm_provider_url: Option<String>,
    pub llm_provider_key: Option<String>,
    pub llm_model_default: String,
    pub tool_gateway_url: Option<String>,
    pub tool_loading_strategy: String,
    pub max_tools_per_request: usize,
    pub max_context_tokens: usize,
    pub max_response_tokens: usize,
    pub approval_deadline: Duration,
    pub approval_poll_interval: Duration,
    pub approval_tracker_url: Option<String>,
    pub enable_intent_llm_fallback: bool,
    pub keepalive_interval: Duration,
    pub history_summarize_after_turns: usize,
    pub subtask_retry_budget: u32,
    pub retention_days: u32,
}

impl ServeConfig {
    /// Reads every tunable in §6's environment table, falling back to its
    /// documented default when unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("ORCHESTRATOR_API_KEY").ok().filter(|s| !s.is_empty()),
            db_url: env_or("DB_URL", "sqlite::memory:"),
            user_message_db_path: env_or("USER_MESSAGE_DB_PATH", "user_messages.db"),
            llm_provider_url: std::env::var("LLM_PROVIDER_URL").ok(),
            llm_provider_key: std::env::var("LLM_PROVIDER_KEY").ok(),
            llm_model_default: env_or("LLM_MODEL_DEFAULT", "gpt-4o-mini"),
            tool_gateway_url: std::env::var("TOOL_GATEWAY_URL").ok(),
            tool_loading_strategy: env_or("TOOL_LOADING_STRATEGY", "progressive"),
            max_tools_per_request: env_parse("MAX_TOOLS_PER_REQUEST", 30),
            max_context_tokens: env_parse("MAX_CONTEXT_TOKENS", 128_000),
            max_response_tokens: env_parse("MAX_RESPONSE_TOKENS", 4_096),
            approval_deadline: Duration::from_secs(env_parse("APPROVAL_DEADLINE_SECONDS", 24 * 3600)),
            approval_poll_interval: Duration::from_secs(env_parse("APPROVAL_POLL_SECONDS", 30)),
            approval_tracker_url: std::env::var("APPROVAL_TRACKER_URL").ok(),
            enable_intent_llm_fallback: env_parse("ENABLE_INTENT_LLM_FALLBACK", false),
            keepalive_interval: Duration::from_secs(env_parse("KEEPALIVE_INTERVAL_SECONDS", 15)),
            history_summarize_after_turns: env_parse("HISTORY_SUMMARIZE_AFTER_TURNS", 30),
            subtask_retry_budget: env_parse("SUBTASK_RETRY_BUDGET", 2),
            retention_days: env_parse("RETENTION_DAYS", 30),
        }
    }
}
