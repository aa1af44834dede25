//! Human-in-the-loop approval tracking: the external system of record for a pending
//! [`Approval`], and idempotent decision ingestion back onto [`WorkflowState`].
//!
//! The workflow graph itself ([`crate::workflow::nodes::DecideNextNode`],
//! [`crate::workflow::nodes::ApprovalGateNode`]) only touches `state.approval` — it
//! never calls out to a tracker, so it stays synchronous and test-friendly without a
//! network dependency. [`ApprovalTracker`] is the collaborator a caller outside the
//! graph (the serving layer) uses to: mirror a freshly created approval to wherever a
//! human actually sees it (ticket, Slack message, dashboard row), and to learn of a
//! decision via webhook or by polling.
//!
//! [`record_decision`] is the single idempotent entry point both ingestion paths call
//! to apply a decision onto a loaded [`WorkflowState`]; a decision for an approval id
//! the caller hasn't loaded yet (the race between `decide_next` creating the approval
//! and a human deciding it before the checkpoint lands) is the caller's to hold and
//! retry, not something this module buffers — there is nothing to apply a decision
//! *to* until the workflow record with that approval id exists.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::OrchestratorError;
use crate::state::{Approval, ApprovalDecision, RiskLevel};

/// Default time an approval stays open before [`is_expired`] reports it expired.
pub const DEFAULT_APPROVAL_DEADLINE_MS: i64 = 24 * 3600 * 1000;
/// Default cadence for the polling-fallback decision path.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// What the tracker should show a human about the workflow asking for sign-off.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRequest<'a> {
    pub workflow_id: &'a str,
    pub approval_id: &'a str,
    pub summary: &'a str,
    pub risk_level: RiskLevel,
    pub deadline: i64,
}

/// A decision as reported by the tracker, whether via webhook or poll.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalDecisionEvent {
    pub approval_id: String,
    pub decision: ApprovalDecision,
    pub decider: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("tracker rejected the request: {0}")]
    InvalidRequest(String),
}

impl From<TrackerError> for OrchestratorError {
    fn from(e: TrackerError) -> Self {
        OrchestratorError::Unavailable(e.to_string())
    }
}

/// External system of record for approvals awaiting a human decision.
///
/// There is exactly one production implementation ([`HttpApprovalTracker`]) and one
/// in-memory fake ([`InMemoryApprovalTracker`]) for tests, mirroring the
/// [`crate::tool_source::ToolSource`] / [`crate::tool_source::McpToolSource`] /
/// [`crate::tool_source::MockToolSource`] split.
#[async_trait]
pub trait ApprovalTracker: Send + Sync {
    /// Registers a new pending approval on the tracker. Called once, when
    /// `decide_next` first creates `state.approval`.
    async fn create_approval(&self, request: &ApprovalRequest<'_>) -> Result<(), TrackerError>;

    /// Returns the decision for `approval_id` if one has been recorded on the tracker,
    /// used by the polling-fallback ingestion path. `Ok(None)` means still pending.
    async fn poll_decision(
        &self,
        approval_id: &str,
    ) -> Result<Option<ApprovalDecisionEvent>, TrackerError>;
}

/// `reqwest`-based tracker backed by a webhook-capable external service, reached via
/// `base_url` (e.g. the `APPROVAL_TRACKER_URL` environment variable's value).
pub struct HttpApprovalTracker {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApprovalTracker {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    decision: Option<ApprovalDecisionEvent>,
}

#[async_trait]
impl ApprovalTracker for HttpApprovalTracker {
    async fn create_approval(&self, request: &ApprovalRequest<'_>) -> Result<(), TrackerError> {
        let url = format!("{}/approvals", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TrackerError::InvalidRequest(format!(
                "create_approval HTTP {status}: {text}"
            )));
        }
        Ok(())
    }

    async fn poll_decision(
        &self,
        approval_id: &str,
    ) -> Result<Option<ApprovalDecisionEvent>, TrackerError> {
        let url = format!(
            "{}/approvals/{}",
            self.base_url.trim_end_matches('/'),
            approval_id
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TrackerError::Transport(format!(
                "poll_decision HTTP {status}: {text}"
            )));
        }
        let body: PollResponse = resp
            .json()
            .await
            .map_err(|e| TrackerError::Transport(e.to_string()))?;
        Ok(body.decision)
    }
}

/// In-memory fake tracker for tests: [`Self::decide`] stages a decision a subsequent
/// [`Self::poll_decision`] call returns.
#[derive(Default)]
pub struct InMemoryApprovalTracker {
    created: std::sync::Mutex<Vec<String>>,
    decisions: std::sync::Mutex<std::collections::HashMap<String, ApprovalDecisionEvent>>,
}

impl InMemoryApprovalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a decision that `poll_decision` will return for `approval_id`.
    pub fn decide(&self, approval_id: impl Into<String>, event: ApprovalDecisionEvent) {
        self.decisions
            .lock()
            .unwrap()
            .insert(approval_id.into(), event);
    }

    /// Ids passed to `create_approval`, in call order; lets a test assert exactly one
    /// approval was ever registered for a workflow.
    pub fn created_ids(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApprovalTracker for InMemoryApprovalTracker {
    async fn create_approval(&self, request: &ApprovalRequest<'_>) -> Result<(), TrackerError> {
        self.created
            .lock()
            .unwrap()
            .push(request.approval_id.to_string());
        Ok(())
    }

    async fn poll_decision(
        &self,
        approval_id: &str,
    ) -> Result<Option<ApprovalDecisionEvent>, TrackerError> {
        Ok(self.decisions.lock().unwrap().get(approval_id).cloned())
    }
}

/// Outcome of applying an [`ApprovalDecisionEvent`] to a loaded [`WorkflowState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// The decision was new and has been applied; the caller should persist and
    /// resume the run from `approval_gate`.
    Applied,
    /// An approval with this id was already decided; re-applying the same or a
    /// conflicting decision is a no-op, so duplicate webhook deliveries are safe.
    AlreadyDecided,
}

/// Applies `event` onto `state.approval` if the ids match and it isn't already
/// decided. Returns [`OrchestratorError::NotFound`] if `state.approval` is absent or
/// names a different id — the caller's cue to hold the event and retry once the
/// workflow record with that approval id has actually loaded, per this module's
/// "held, not dropped" contract.
pub fn record_decision(
    state: &mut crate::state::WorkflowState,
    event: ApprovalDecisionEvent,
) -> Result<DecisionOutcome, OrchestratorError> {
    let approval = state.approval.as_mut().ok_or_else(|| {
        OrchestratorError::NotFound(format!(
            "no pending approval on workflow {}",
            state.workflow_id
        ))
    })?;

    if approval.id != event.approval_id {
        return Err(OrchestratorError::NotFound(format!(
            "approval id {} does not match pending approval {}",
            event.approval_id, approval.id
        )));
    }

    if approval.decision.is_some() {
        return Ok(DecisionOutcome::AlreadyDecided);
    }

    apply_decision(approval, event);
    Ok(DecisionOutcome::Applied)
}

fn apply_decision(approval: &mut Approval, event: ApprovalDecisionEvent) {
    approval.decision = Some(event.decision);
    approval.decider = event.decider;
    approval.reason = event.reason;
    approval.decided_at = Some(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0),
    );
}

/// Whether `approval`'s deadline has passed as of `now` (epoch millis) while still
/// undecided. A caller observing `true` should route the workflow to `handle_error`
/// with [`OrchestratorError::ApprovalExpired`].
pub fn is_expired(approval: &Approval, now: i64) -> bool {
    approval.decision.is_none()
        && approval
            .deadline
            .is_some_and(|deadline| now >= deadline)
}
