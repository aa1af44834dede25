//! Store trait for cross-workflow, non-authoritative memory (session cache accelerator).
//!
//! Namespaced key-value storage, isolated by [`Namespace`] (e.g. `[session_id]`). This is
//! deliberately smaller than a general-purpose long-term memory store: the only backing
//! implementation is an in-process accelerator in front of the checkpoint store, never the
//! store of record.

use async_trait::async_trait;
use std::time::SystemTime;

/// Namespace for Store: e.g. `[session_id]` or `[session_id, "history"]`.
pub type Namespace = Vec<String>;

/// Error for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("not found")]
    NotFound,
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// A stored item with metadata.
#[derive(Debug, Clone)]
pub struct Item {
    pub value: serde_json::Value,
    pub key: String,
    pub namespace: Namespace,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Item {
    pub fn new(namespace: Namespace, key: String, value: serde_json::Value) -> Self {
        let now = SystemTime::now();
        Self {
            value,
            key,
            namespace,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Match type for namespace filtering in list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceMatchType {
    Prefix,
    Suffix,
}

/// Condition for matching namespaces in list operations.
#[derive(Debug, Clone)]
pub struct MatchCondition {
    pub match_type: NamespaceMatchType,
    pub path: Vec<String>,
}

impl MatchCondition {
    pub fn prefix(path: Vec<String>) -> Self {
        Self {
            match_type: NamespaceMatchType::Prefix,
            path,
        }
    }

    pub fn suffix(path: Vec<String>) -> Self {
        Self {
            match_type: NamespaceMatchType::Suffix,
            path,
        }
    }
}

/// Cross-workflow, namespace-scoped key-value store.
///
/// Used as the session-history accelerator described in the concurrency model: eviction
/// must never lose state because the checkpoint store is always the record of truth.
#[async_trait]
pub trait Store: Send + Sync {
    async fn put(
        &self,
        namespace: &Namespace,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError>;

    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<Item>, StoreError>;

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<(), StoreError>;

    async fn list(&self, namespace: &Namespace) -> Result<Vec<Item>, StoreError>;
}
