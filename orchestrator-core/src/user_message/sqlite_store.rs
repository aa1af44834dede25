//! SQLite-backed user message store. Persistent per-thread message history that
//! survives a [`crate::state::WorkflowState`] eviction or a process restart
//! (§5: "eviction never loses state because it is also persisted").

use std::path::Path;

use async_trait::async_trait;
use rusqlite::params;

use crate::message::{Message, ToolCall};
use crate::user_message::{UserMessageStore, UserMessageStoreError};

/// SQLite-backed store: one table `user_messages (id, thread_id, role, content,
/// tool_call_id, tool_calls, timestamp)`. `id` is auto-increment and used as the
/// pagination cursor (`before`).
pub struct SqliteUserMessageStore {
    db_path: std::path::PathBuf,
}

fn message_to_row(msg: &Message) -> (&'static str, &str, Option<&str>, Option<String>, i64) {
    match msg {
        Message::System { content, timestamp } => ("system", content.as_str(), None, None, *timestamp),
        Message::User { content, timestamp } => ("user", content.as_str(), None, None, *timestamp),
        Message::Assistant {
            content,
            tool_calls,
            timestamp,
        } => {
            let tool_calls = if tool_calls.is_empty() {
                None
            } else {
                Some(serde_json::to_string(tool_calls).unwrap_or_default())
            };
            ("assistant", content.as_str(), None, tool_calls, *timestamp)
        }
        Message::Tool {
            content,
            tool_call_id,
            timestamp,
        } => ("tool", content.as_str(), Some(tool_call_id.as_str()), None, *timestamp),
    }
}

fn row_to_message(
    role: &str,
    content: &str,
    tool_call_id: Option<String>,
    tool_calls: Option<String>,
    timestamp: i64,
) -> Message {
    match role {
        "system" => Message::System {
            content: content.to_string(),
            timestamp,
        },
        "assistant" => {
            let tool_calls: Vec<ToolCall> = tool_calls
                .and_then(|raw| serde_json::from_str(&raw).ok())
                .unwrap_or_default();
            Message::Assistant {
                content: content.to_string(),
                tool_calls,
                timestamp,
            }
        }
        "tool" => Message::Tool {
            content: content.to_string(),
            tool_call_id: tool_call_id.unwrap_or_default(),
            timestamp,
        },
        _ => Message::User {
            content: content.to_string(),
            timestamp,
        },
    }
}

impl SqliteUserMessageStore {
    /// Creates the store and ensures the table exists. `path` is the SQLite file path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, UserMessageStoreError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path)
            .map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS user_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                tool_call_id TEXT,
                tool_calls TEXT,
                timestamp INTEGER NOT NULL
            )
            "#,
            [],
        )
        .map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_user_messages_thread_id ON user_messages(thread_id)",
            [],
        )
        .map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
        Ok(Self { db_path })
    }
}

#[async_trait]
impl UserMessageStore for SqliteUserMessageStore {
    async fn append(
        &self,
        thread_id: &str,
        message: &Message,
    ) -> Result<(), UserMessageStoreError> {
        let (role, content, tool_call_id, tool_calls, timestamp) = message_to_row(message);
        let thread_id = thread_id.to_string();
        let content = content.to_string();
        let tool_call_id = tool_call_id.map(str::to_string);
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
            conn.execute(
                "INSERT INTO user_messages (thread_id, role, content, tool_call_id, tool_calls, timestamp) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![thread_id, role, content, tool_call_id, tool_calls, timestamp],
            )
            .map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
            Ok::<(), UserMessageStoreError>(())
        })
        .await
        .map_err(|e| UserMessageStoreError::Other(e.to_string()))?
    }

    async fn list(
        &self,
        thread_id: &str,
        before: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, UserMessageStoreError> {
        let thread_id = thread_id.to_string();
        let limit = limit.unwrap_or(100).min(1000);
        let db_path = self.db_path.clone();
        type Row = (String, String, Option<String>, Option<String>, i64);
        let rows: Vec<Row> = tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
            let sql = match before {
                Some(_) => "SELECT role, content, tool_call_id, tool_calls, timestamp FROM user_messages \
                            WHERE thread_id = ?1 AND id < ?2 ORDER BY id ASC LIMIT ?3",
                None => "SELECT role, content, tool_call_id, tool_calls, timestamp FROM user_messages \
                         WHERE thread_id = ?1 ORDER BY id ASC LIMIT ?2",
            };
            let mut stmt = conn.prepare(sql).map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
            let rows = match before {
                Some(b) => stmt.query(params![thread_id, b as i64, limit as i64]),
                None => stmt.query(params![thread_id, limit as i64]),
            }
            .map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
            let mut out = Vec::new();
            let mut rows = rows;
            while let Some(row) = rows.next().map_err(|e| UserMessageStoreError::Other(e.to_string()))? {
                let role: String = row.get(0).map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
                let content: String = row.get(1).map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
                let tool_call_id: Option<String> =
                    row.get(2).map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
                let tool_calls: Option<String> =
                    row.get(3).map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
                let timestamp: i64 = row.get(4).map_err(|e| UserMessageStoreError::Other(e.to_string()))?;
                out.push((role, content, tool_call_id, tool_calls, timestamp));
            }
            Ok::<Vec<Row>, UserMessageStoreError>(out)
        })
        .await
        .map_err(|e| UserMessageStoreError::Other(e.to_string()))??;
        Ok(rows
            .into_iter()
            .map(|(role, content, tool_call_id, tool_calls, timestamp)| {
                row_to_message(&role, &content, tool_call_id, tool_calls, timestamp)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn sqlite_append_and_list_order() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteUserMessageStore::new(file.path()).unwrap();
        store.append("t1", &Message::user("hi")).await.unwrap();
        store.append("t1", &Message::assistant("hello")).await.unwrap();
        store.append("t1", &Message::user("bye")).await.unwrap();
        let msgs = store.list("t1", None, Some(10)).await.unwrap();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].content(), "hi");
        assert!(matches!(msgs[1], Message::Assistant { .. }));
        assert_eq!(msgs[2].content(), "bye");
    }

    #[tokio::test]
    async fn sqlite_round_trips_tool_calls_and_tool_replies() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteUserMessageStore::new(file.path()).unwrap();
        let call = ToolCall {
            id: "c1".into(),
            name: "fs.read".into(),
            arguments: serde_json::json!({"path": "a.rs"}),
        };
        store
            .append("t1", &Message::assistant_with_tool_calls("", vec![call]))
            .await
            .unwrap();
        store.append("t1", &Message::tool("contents of a.rs", "c1")).await.unwrap();

        let msgs = store.list("t1", None, Some(10)).await.unwrap();
        match &msgs[0] {
            Message::Assistant { tool_calls, .. } => {
                assert_eq!(tool_calls.len(), 1);
                assert_eq!(tool_calls[0].name, "fs.read");
            }
            other => panic!("expected Assistant, got {other:?}"),
        }
        match &msgs[1] {
            Message::Tool { tool_call_id, .. } => assert_eq!(tool_call_id, "c1"),
            other => panic!("expected Tool, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sqlite_list_before_and_limit() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteUserMessageStore::new(file.path()).unwrap();
        for i in 0..5 {
            store.append("t2", &Message::user(format!("m{i}"))).await.unwrap();
        }
        let page1 = store.list("t2", None, Some(2)).await.unwrap();
        assert_eq!(page1.len(), 2);
        let id_before = 3u64; // cursor: next page starts before id 3
        let page2 = store.list("t2", Some(id_before), Some(2)).await.unwrap();
        assert_eq!(page2.len(), 2);
    }
}
