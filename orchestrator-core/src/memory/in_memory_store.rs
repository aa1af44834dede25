//! In-memory Store. Not persistent; used as the default session-cache accelerator and in tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::graph::{Item, Namespace, Store, StoreError};

#[derive(Debug, Clone)]
struct StoredItem {
    value: serde_json::Value,
    namespace: Namespace,
    key: String,
    created_at: std::time::SystemTime,
    updated_at: std::time::SystemTime,
}

impl StoredItem {
    fn update(&mut self, value: serde_json::Value) {
        self.value = value;
        self.updated_at = std::time::SystemTime::now();
    }

    fn to_item(&self) -> Item {
        Item {
            value: self.value.clone(),
            key: self.key.clone(),
            namespace: self.namespace.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn map_key(namespace: &Namespace, key: &str) -> String {
    format!("{}\0{}", namespace.join("\0"), key)
}

fn namespace_prefix(namespace: &Namespace) -> String {
    if namespace.is_empty() {
        String::new()
    } else {
        format!("{}\0", namespace.join("\0"))
    }
}

/// In-memory [`Store`]. Not persistent; eviction-safe because the checkpoint store
/// remains the record of truth for workflow state.
pub struct InMemoryStore {
    inner: Arc<RwLock<HashMap<String, StoredItem>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put(
        &self,
        namespace: &Namespace,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let k = map_key(namespace, key);
        let mut guard = self.inner.write().await;
        if let Some(existing) = guard.get_mut(&k) {
            existing.update(value.clone());
        } else {
            let now = std::time::SystemTime::now();
            guard.insert(
                k,
                StoredItem {
                    value: value.clone(),
                    namespace: namespace.clone(),
                    key: key.to_string(),
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        Ok(())
    }

    async fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<Item>, StoreError> {
        let k = map_key(namespace, key);
        Ok(self.inner.read().await.get(&k).map(|s| s.to_item()))
    }

    async fn delete(&self, namespace: &Namespace, key: &str) -> Result<(), StoreError> {
        let k = map_key(namespace, key);
        self.inner.write().await.remove(&k);
        Ok(())
    }

    async fn list(&self, namespace: &Namespace) -> Result<Vec<Item>, StoreError> {
        let prefix = namespace_prefix(namespace);
        let guard = self.inner.read().await;
        let mut items: Vec<Item> = guard
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, v)| v.to_item())
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(items)
    }
}
