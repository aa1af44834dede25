//! In-memory [`Checkpointer`] used by tests and by single-process deployments
//! that don't need durability across restarts.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::graph::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointMetadata, Checkpointer,
    RunnableConfig,
};

type ThreadKey = (String, String);

struct Entry<S> {
    checkpoint: Checkpoint<S>,
}

/// Keeps every checkpoint ever written, per `(thread_id, checkpoint_ns)`, in
/// insertion order. `get_tuple` returns the most recent one unless
/// `config.checkpoint_id` pins an older one.
pub struct MemorySaver<S> {
    threads: RwLock<HashMap<ThreadKey, Vec<Entry<S>>>>,
}

impl<S> MemorySaver<S> {
    pub fn new() -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
        }
    }
}

impl<S> Default for MemorySaver<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn thread_key(config: &RunnableConfig) -> Result<ThreadKey, CheckpointError> {
    let thread_id = config
        .thread_id
        .clone()
        .ok_or(CheckpointError::ThreadIdRequired)?;
    Ok((thread_id, config.checkpoint_ns.clone()))
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let key = thread_key(config)?;
        let mut threads = self
            .threads
            .write()
            .map_err(|_| CheckpointError::Storage("lock poisoned".into()))?;
        threads.entry(key).or_default().push(Entry {
            checkpoint: checkpoint.copy(),
        });
        Ok(checkpoint.id.clone())
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let key = thread_key(config)?;
        let threads = self
            .threads
            .read()
            .map_err(|_| CheckpointError::Storage("lock poisoned".into()))?;
        let Some(entries) = threads.get(&key) else {
            return Ok(None);
        };
        let found = match &config.checkpoint_id {
            Some(id) => entries.iter().find(|e| &e.checkpoint.id == id),
            None => entries.last(),
        };
        Ok(found.map(|e| (e.checkpoint.copy(), e.checkpoint.metadata.clone())))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let key = thread_key(config)?;
        let threads = self
            .threads
            .read()
            .map_err(|_| CheckpointError::Storage("lock poisoned".into()))?;
        let Some(entries) = threads.get(&key) else {
            return Ok(Vec::new());
        };

        let mut items: Vec<CheckpointListItem> = entries
            .iter()
            .rev()
            .map(|e| CheckpointListItem {
                checkpoint_id: e.checkpoint.id.clone(),
                metadata: e.checkpoint.metadata.clone(),
            })
            .collect();

        if let Some(before) = before {
            if let Some(pos) = items.iter().position(|i| i.checkpoint_id == before) {
                items = items.split_off(pos + 1);
            }
        }
        if let Some(after) = after {
            if let Some(pos) = items.iter().position(|i| i.checkpoint_id == after) {
                items.truncate(pos);
            }
        }
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }
}
