//! # Memory: Checkpointing and Session Store
//!
//! Two distinct capabilities:
//!
//! 1. **Checkpointer** — the generic [`crate::graph::Checkpointer`] trait boundary used
//!    by the graph engine to snapshot/restore a run. [`MemorySaver`] is the in-memory
//!    implementation (dev, tests); [`SqlxCheckpointStore`] is the durable,
//!    event-sourced store a deployed workflow engine persists through.
//! 2. **Store** — cross-session key-value storage via [`crate::graph::Store`], isolated
//!    by namespace. [`InMemoryStore`] is the only implementation; it is explicitly a
//!    non-authoritative accelerator, not the source of truth.
//!
//! [`RunnableConfig`](crate::graph::RunnableConfig) carries `thread_id`/`checkpoint_id`/
//! `checkpoint_ns`/`user_id` through to whichever checkpointer is compiled in.

mod in_memory_store;
mod memory_saver;
mod sqlx_checkpoint_store;

pub use in_memory_store::InMemoryStore;
pub use memory_saver::MemorySaver;
pub use sqlx_checkpoint_store::{
    CheckpointStoreError, ReplaySummary, SqlxCheckpointStore, WorkflowSummary,
};
