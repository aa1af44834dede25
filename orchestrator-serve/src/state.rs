//! Shared application state: the collaborators every route handler needs, plus
//! the non-authoritative session cache (§5: "an in-memory session cache may hold
//! recent turns but must be treated as a non-authoritative accelerator").

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use orchestrator_core::{
    ApprovalTracker, Checkpointer, LlmClient, Message, RolePrompts, SqlxCheckpointStore,
    ToolSource, UserMessageStore, WorkflowState,
};

use crate::config::ServeConfig;

/// One session's cached turns plus the version they were written at.
#[derive(Clone, Default)]
struct SessionEntry {
    messages: Vec<Message>,
    version: u64,
}

/// Recent conversational turns for one session, kept only as a latency
/// shortcut; [`orchestrator_core::UserMessageStore`] is the durable copy a
/// restart or eviction falls back to.
///
/// `replace` takes the version the caller last read and only applies the
/// write if the entry hasn't moved since, so two concurrent turns on the same
/// session that finish out of order can't silently clobber each other (§4.3:
/// "session history append uses a compare-and-swap on the session version to
/// avoid reorder").
#[derive(Default)]
pub struct SessionCache {
    by_session: RwLock<HashMap<String, SessionEntry>>,
}

/// Outcome of a CAS-guarded [`SessionCache::replace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The write applied; carries the entry's new version.
    Applied(u64),
    /// `expected_version` was stale; another writer moved the entry first.
    Stale,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached turns and the version to pass back into `replace`.
    pub fn get(&self, session_id: &str) -> (Vec<Message>, u64) {
        self.by_session
            .read()
            .expect("session cache lock poisoned")
            .get(session_id)
            .map(|e| (e.messages.clone(), e.version))
            .unwrap_or_default()
    }

    /// Replaces a session's cached turns if `expected_version` still matches
    /// the entry's current version (0 for a session never written before).
    pub fn replace(
        &self,
        session_id: &str,
        expected_version: u64,
        messages: Vec<Message>,
    ) -> ReplaceOutcome {
        let mut guard = self.by_session.write().expect("session cache lock poisoned");
        let current_version = guard.get(session_id).map(|e| e.version).unwrap_or(0);
        if current_version != expected_version {
            return ReplaceOutcome::Stale;
        }
        let new_version = current_version + 1;
        guard.insert(
            session_id.to_string(),
            SessionEntry {
                messages,
                version: new_version,
            },
        );
        ReplaceOutcome::Applied(new_version)
    }
}

/// Everything a route handler needs, cheaply `Clone`-able (every field is an
/// `Arc` or `Copy` config value) so it can be extracted once per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServeConfig>,
    pub llm: Arc<dyn LlmClient>,
    pub tool_source: Arc<dyn ToolSource>,
    pub prompts: RolePrompts,
    pub checkpointer: Arc<dyn Checkpointer<WorkflowState>>,
    pub store: Arc<SqlxCheckpointStore>,
    pub user_messages: Arc<dyn UserMessageStore>,
    pub approval_tracker: Arc<dyn ApprovalTracker>,
    pub sessions: Arc<SessionCache>,
}
