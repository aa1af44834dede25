//! Wire protocol for the HTTP/SSE front door.
//!
//! This crate has no dependency on the orchestration engine; the serving layer
//! bridges its own `StreamEvent<WorkflowState>` into [`ProtocolEvent`] and writes
//! one SSE `data:` line per event.

pub mod event;

pub use event::ProtocolEvent;
