//! State channels: reducers that decide how a node's partial update is merged
//! into the graph's shared state, plus a couple of small synchronization values
//! (`EphemeralValue`, `NamedBarrierValue`) used by nodes that wait on multiple
//! upstream branches before proceeding.

mod ephemeral_value;
mod error;
mod named_barrier;
mod updater;

pub use ephemeral_value::EphemeralValue;
pub use error::ChannelError;
pub use named_barrier::{NamedBarrierUpdate, NamedBarrierValue};
pub use updater::{boxed_updater, BoxedStateUpdater, FieldBasedUpdater, ReplaceUpdater, StateUpdater};
