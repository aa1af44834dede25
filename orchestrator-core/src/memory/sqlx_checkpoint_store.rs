//! Durable workflow checkpoint store backed by `sqlx::SqlitePool`.
//!
//! Two tables: `workflow_snapshot` (one row per workflow, optimistic version)
//! and `workflow_event` (append-only, `(workflow_id, seq)` primary key). The
//! event log is the sole serialization point for a workflow: `append_events`
//! only succeeds when the caller's `expected_last_seq` still matches.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::ids::WorkflowId;
use crate::state::{Event, EventKind, WorkflowState, WorkflowStatus};

/// One row of `list_workflows`/admin listing output.
#[derive(Debug, Clone)]
pub struct WorkflowSummary {
    pub workflow_id: WorkflowId,
    pub status: WorkflowStatus,
    pub updated_at: i64,
}

/// Outcome of rebuilding a workflow's view from its event log, used by the
/// admin `replay` command. The event log carries per-kind payloads, not full
/// state diffs, so this reports the log's shape rather than reconstructing an
/// arbitrary `WorkflowState` the way a true event-sourced fold would.
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub workflow_id: WorkflowId,
    pub event_count: usize,
    pub last_seq: u64,
    pub last_kind: Option<EventKind>,
    pub snapshot_status: Option<WorkflowStatus>,
}

/// Errors from the checkpoint store.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointStoreError {
    #[error("stale sequence: expected {expected}, store is at {actual}")]
    Conflict { expected: u64, actual: u64 },
    #[error("stale snapshot version: expected {expected}, store is at {actual}")]
    VersionConflict { expected: u32, actual: u32 },
    #[error("workflow not found: {0}")]
    NotFound(WorkflowId),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
}

/// sqlx-backed implementation of the checkpoint store contract.
///
/// Construction runs the schema migration; callers do not need a separate
/// migration step.
pub struct SqlxCheckpointStore {
    pool: SqlitePool,
}

impl SqlxCheckpointStore {
    pub async fn connect(database_url: &str) -> Result<Self, CheckpointStoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn migrate(&self) -> Result<(), CheckpointStoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS workflow_snapshot (
                workflow_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                json_state TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                version INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS workflow_event (
                workflow_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                causing_node TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                PRIMARY KEY (workflow_id, seq)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Atomic check-and-append: fails with `Conflict` if `expected_last_seq`
    /// doesn't match the store's current max `seq` for this workflow.
    pub async fn append_events(
        &self,
        workflow_id: &WorkflowId,
        expected_last_seq: u64,
        events: &[Event],
    ) -> Result<u64, CheckpointStoreError> {
        let mut tx = self.pool.begin().await?;

        let actual: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(seq) FROM workflow_event WHERE workflow_id = ?",
        )
        .bind(workflow_id.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let actual = actual.unwrap_or(0) as u64;

        if actual != expected_last_seq {
            return Err(CheckpointStoreError::Conflict {
                expected: expected_last_seq,
                actual,
            });
        }

        let mut last_seq = actual;
        for event in events {
            let payload = serde_json::to_string(&event.payload)?;
            sqlx::query(
                "INSERT INTO workflow_event (workflow_id, seq, kind, payload_json, causing_node, timestamp)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(workflow_id.as_str())
            .bind(event.seq as i64)
            .bind(event_kind_to_str(event.kind))
            .bind(payload)
            .bind(&event.causing_node)
            .bind(event.timestamp)
            .execute(&mut *tx)
            .await?;
            last_seq = event.seq;
        }

        tx.commit().await?;
        Ok(last_seq)
    }

    /// Optimistic-concurrency snapshot write. The snapshot may lag the event
    /// log but must never be ahead of it; callers are responsible for that
    /// ordering (write events first, then the snapshot).
    pub async fn write_snapshot(
        &self,
        state: &WorkflowState,
        expected_version: u32,
    ) -> Result<u32, CheckpointStoreError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM workflow_snapshot WHERE workflow_id = ?",
        )
        .bind(state.workflow_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let actual_version = current.unwrap_or(0) as u32;
        if actual_version != expected_version {
            return Err(CheckpointStoreError::VersionConflict {
                expected: expected_version,
                actual: actual_version,
            });
        }

        let new_version = expected_version + 1;
        let json_state = serde_json::to_string(state)?;
        let status = format!("{:?}", state.status).to_lowercase();

        sqlx::query(
            "INSERT INTO workflow_snapshot (workflow_id, status, json_state, updated_at, version)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(workflow_id) DO UPDATE SET
                status = excluded.status,
                json_state = excluded.json_state,
                updated_at = excluded.updated_at,
                version = excluded.version",
        )
        .bind(state.workflow_id.as_str())
        .bind(status)
        .bind(json_state)
        .bind(state.updated_at)
        .bind(new_version as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(new_version)
    }

    pub async fn load_snapshot(
        &self,
        workflow_id: &WorkflowId,
    ) -> Result<Option<WorkflowState>, CheckpointStoreError> {
        let row = sqlx::query("SELECT json_state FROM workflow_snapshot WHERE workflow_id = ?")
            .bind(workflow_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let json_state: String = row.try_get("json_state")?;
                Ok(Some(serde_json::from_str(&json_state)?))
            }
            None => Ok(None),
        }
    }

    pub async fn read_events(
        &self,
        workflow_id: &WorkflowId,
        from_seq: Option<u64>,
        to_seq: Option<u64>,
    ) -> Result<Vec<Event>, CheckpointStoreError> {
        let from_seq = from_seq.unwrap_or(0) as i64;
        let to_seq = to_seq.unwrap_or(i64::MAX as u64) as i64;

        let rows = sqlx::query(
            "SELECT seq, kind, payload_json, causing_node, timestamp
             FROM workflow_event
             WHERE workflow_id = ? AND seq >= ? AND seq <= ?
             ORDER BY seq ASC",
        )
        .bind(workflow_id.as_str())
        .bind(from_seq)
        .bind(to_seq)
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let seq: i64 = row.try_get("seq")?;
            let kind_str: String = row.try_get("kind")?;
            let payload_json: String = row.try_get("payload_json")?;
            let causing_node: String = row.try_get("causing_node")?;
            let timestamp: i64 = row.try_get("timestamp")?;
            events.push(Event {
                seq: seq as u64,
                workflow_id: workflow_id.clone(),
                kind: str_to_event_kind(&kind_str),
                payload: serde_json::from_str(&payload_json)?,
                timestamp,
                causing_node,
            });
        }
        Ok(events)
    }

    /// Workflow ids whose snapshot status is `awaiting_approval`, used by the
    /// HITL polling fallback when SSE push isn't available.
    pub async fn list_awaiting_approval(&self) -> Result<Vec<WorkflowId>, CheckpointStoreError> {
        let rows = sqlx::query(
            "SELECT workflow_id FROM workflow_snapshot WHERE status = 'awaitingapproval'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.try_get::<String, _>("workflow_id").ok())
            .map(WorkflowId::from)
            .collect())
    }

    /// All known workflows, most recently updated first. Backs the admin
    /// `list-workflows` command.
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>, CheckpointStoreError> {
        let rows = sqlx::query(
            "SELECT workflow_id, status, updated_at FROM workflow_snapshot ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let workflow_id: String = row.try_get("workflow_id")?;
            let status: String = row.try_get("status")?;
            let updated_at: i64 = row.try_get("updated_at")?;
            out.push(WorkflowSummary {
                workflow_id: WorkflowId::from(workflow_id),
                status: str_to_workflow_status(&status),
                updated_at,
            });
        }
        Ok(out)
    }

    /// Forces a workflow's status to `Cancelled`. Fails with `NotFound` if the
    /// workflow has no snapshot; no-ops (but still succeeds) if already
    /// terminal, since a double cancel is not an error worth surfacing to an
    /// operator.
    pub async fn cancel_workflow(&self, workflow_id: &WorkflowId) -> Result<(), CheckpointStoreError> {
        let mut state = self
            .load_snapshot(workflow_id)
            .await?
            .ok_or_else(|| CheckpointStoreError::NotFound(workflow_id.clone()))?;
        if state.status.is_terminal() {
            return Ok(());
        }
        let version: i64 = sqlx::query_scalar(
            "SELECT version FROM workflow_snapshot WHERE workflow_id = ?",
        )
        .bind(workflow_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        state.status = WorkflowStatus::Cancelled;
        self.write_snapshot(&state, version as u32).await?;
        Ok(())
    }

    /// Rebuilds a summary of a workflow purely from its event log, for the
    /// admin `replay` command. Does not mutate the stored snapshot.
    pub async fn replay(&self, workflow_id: &WorkflowId) -> Result<ReplaySummary, CheckpointStoreError> {
        let events = self.read_events(workflow_id, None, None).await?;
        let snapshot = self.load_snapshot(workflow_id).await?;
        Ok(ReplaySummary {
            workflow_id: workflow_id.clone(),
            event_count: events.len(),
            last_seq: events.last().map(|e| e.seq).unwrap_or(0),
            last_kind: events.last().map(|e| e.kind),
            snapshot_status: snapshot.map(|s| s.status),
        })
    }

    /// Deletes every workflow (snapshot + event log) last updated before
    /// `cutoff_millis`. Returns the number of workflows removed. Backs the
    /// admin `gc` command; does not check `is_terminal()` first, matching the
    /// retention policy being a blunt time-based sweep rather than a
    /// lifecycle-aware one.
    pub async fn gc_older_than(&self, cutoff_millis: i64) -> Result<u64, CheckpointStoreError> {
        let mut tx = self.pool.begin().await?;
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT workflow_id FROM workflow_snapshot WHERE updated_at < ?",
        )
        .bind(cutoff_millis)
        .fetch_all(&mut *tx)
        .await?;
        for id in &ids {
            sqlx::query("DELETE FROM workflow_event WHERE workflow_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM workflow_snapshot WHERE workflow_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(ids.len() as u64)
    }
}

fn str_to_workflow_status(s: &str) -> WorkflowStatus {
    match s {
        "pending" => WorkflowStatus::Pending,
        "running" => WorkflowStatus::Running,
        "awaitingapproval" => WorkflowStatus::AwaitingApproval,
        "paused" => WorkflowStatus::Paused,
        "completed" => WorkflowStatus::Completed,
        "failed" => WorkflowStatus::Failed,
        _ => WorkflowStatus::Cancelled,
    }
}

fn event_kind_to_str(kind: EventKind) -> &'static str {
    match kind {
        EventKind::StateInit => "state_init",
        EventKind::NodeEntered => "node_entered",
        EventKind::NodeExited => "node_exited",
        EventKind::MessageAppended => "message_appended",
        EventKind::SubTaskUpdated => "subtask_updated",
        EventKind::ToolInvoked => "tool_invoked",
        EventKind::ToolResulted => "tool_resulted",
        EventKind::ApprovalRequested => "approval_requested",
        EventKind::ApprovalDecided => "approval_decided",
        EventKind::Checkpointed => "checkpointed",
        EventKind::Failed => "failed",
        EventKind::Completed => "completed",
        EventKind::Cancelled => "cancelled",
        EventKind::CaptureInsight => "capture_insight",
    }
}

fn str_to_event_kind(s: &str) -> EventKind {
    match s {
        "state_init" => EventKind::StateInit,
        "node_entered" => EventKind::NodeEntered,
        "node_exited" => EventKind::NodeExited,
        "message_appended" => EventKind::MessageAppended,
        "subtask_updated" => EventKind::SubTaskUpdated,
        "tool_invoked" => EventKind::ToolInvoked,
        "tool_resulted" => EventKind::ToolResulted,
        "approval_requested" => EventKind::ApprovalRequested,
        "approval_decided" => EventKind::ApprovalDecided,
        "checkpointed" => EventKind::Checkpointed,
        "failed" => EventKind::Failed,
        "completed" => EventKind::Completed,
        "cancelled" => EventKind::Cancelled,
        _ => EventKind::CaptureInsight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SessionId;

    async fn temp_store() -> SqlxCheckpointStore {
        SqlxCheckpointStore::connect("sqlite::memory:")
            .await
            .expect("connect to in-memory sqlite")
    }

    fn sample_state() -> WorkflowState {
        WorkflowState::new(WorkflowId::new(), SessionId::new(), "delegate_task")
    }

    #[tokio::test]
    async fn write_and_load_snapshot_roundtrips() {
        let store = temp_store().await;
        let state = sample_state();
        let version = store.write_snapshot(&state, 0).await.unwrap();
        assert_eq!(version, 1);

        let loaded = store.load_snapshot(&state.workflow_id).await.unwrap();
        assert_eq!(loaded.unwrap().workflow_id, state.workflow_id);
    }

    #[tokio::test]
    async fn write_snapshot_rejects_stale_version() {
        let store = temp_store().await;
        let state = sample_state();
        store.write_snapshot(&state, 0).await.unwrap();

        let err = store.write_snapshot(&state, 0).await.unwrap_err();
        assert!(matches!(
            err,
            CheckpointStoreError::VersionConflict {
                expected: 0,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn append_events_rejects_stale_expected_seq() {
        let store = temp_store().await;
        let wf = WorkflowId::new();
        let event = Event::new(1, wf.clone(), EventKind::StateInit, serde_json::json!({}), "n");
        store.append_events(&wf, 0, &[event]).await.unwrap();

        let stale = Event::new(2, wf.clone(), EventKind::NodeEntered, serde_json::json!({}), "n");
        let err = store.append_events(&wf, 0, &[stale]).await.unwrap_err();
        assert!(matches!(
            err,
            CheckpointStoreError::Conflict {
                expected: 0,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn read_events_returns_ordered_range() {
        let store = temp_store().await;
        let wf = WorkflowId::new();
        let events: Vec<Event> = (1..=3)
            .map(|seq| {
                Event::new(
                    seq,
                    wf.clone(),
                    EventKind::NodeEntered,
                    serde_json::json!({"seq": seq}),
                    "n",
                )
            })
            .collect();
        store.append_events(&wf, 0, &events).await.unwrap();

        let read = store.read_events(&wf, None, None).await.unwrap();
        assert_eq!(read.len(), 3);
        assert_eq!(read[0].seq, 1);
        assert_eq!(read[2].seq, 3);
    }

    #[tokio::test]
    async fn list_awaiting_approval_finds_matching_workflows() {
        let store = temp_store().await;
        let mut state = sample_state();
        state.status = crate::state::WorkflowStatus::AwaitingApproval;
        store.write_snapshot(&state, 0).await.unwrap();

        let waiting = store.list_awaiting_approval().await.unwrap();
        assert!(waiting.contains(&state.workflow_id));
    }

    #[tokio::test]
    async fn list_workflows_reports_every_snapshot() {
        let store = temp_store().await;
        let a = sample_state();
        let b = sample_state();
        store.write_snapshot(&a, 0).await.unwrap();
        store.write_snapshot(&b, 0).await.unwrap();

        let all = store.list_workflows().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|w| w.workflow_id == a.workflow_id));
        assert!(all.iter().any(|w| w.workflow_id == b.workflow_id));
    }

    #[tokio::test]
    async fn cancel_workflow_sets_cancelled_status() {
        let store = temp_store().await;
        let state = sample_state();
        store.write_snapshot(&state, 0).await.unwrap();

        store.cancel_workflow(&state.workflow_id).await.unwrap();

        let loaded = store.load_snapshot(&state.workflow_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, WorkflowStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_workflow_missing_returns_not_found() {
        let store = temp_store().await;
        let err = store.cancel_workflow(&WorkflowId::new()).await.unwrap_err();
        assert!(matches!(err, CheckpointStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_workflow_is_a_no_op_once_terminal() {
        let store = temp_store().await;
        let mut state = sample_state();
        state.status = WorkflowStatus::Completed;
        store.write_snapshot(&state, 0).await.unwrap();

        store.cancel_workflow(&state.workflow_id).await.unwrap();

        let loaded = store.load_snapshot(&state.workflow_id).await.unwrap().unwrap();
        assert_eq!(loaded.status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn replay_summarizes_event_log_and_snapshot() {
        let store = temp_store().await;
        let wf = WorkflowId::new();
        let events = vec![
            Event::new(1, wf.clone(), EventKind::StateInit, serde_json::json!({}), "n"),
            Event::new(2, wf.clone(), EventKind::Completed, serde_json::json!({}), "n"),
        ];
        store.append_events(&wf, 0, &events).await.unwrap();
        let mut state = sample_state();
        state.workflow_id = wf.clone();
        state.status = WorkflowStatus::Completed;
        store.write_snapshot(&state, 0).await.unwrap();

        let summary = store.replay(&wf).await.unwrap();
        assert_eq!(summary.event_count, 2);
        assert_eq!(summary.last_seq, 2);
        assert_eq!(summary.last_kind, Some(EventKind::Completed));
        assert_eq!(summary.snapshot_status, Some(WorkflowStatus::Completed));
    }

    #[tokio::test]
    async fn gc_older_than_removes_stale_workflows_only() {
        let store = temp_store().await;
        let mut old = sample_state();
        old.updated_at = 1_000;
        let mut fresh = sample_state();
        fresh.updated_at = 9_999_999;
        store.write_snapshot(&old, 0).await.unwrap();
        store.write_snapshot(&fresh, 0).await.unwrap();

        let removed = store.gc_older_than(5_000).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.load_snapshot(&old.workflow_id).await.unwrap().is_none());
        assert!(store.load_snapshot(&fresh.workflow_id).await.unwrap().is_some());
    }
}
