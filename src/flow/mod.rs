//! Flow reconstruction: canonical keys, per-flow state, and the engine that owns the active table.

mod engine;
mod key;
mod state;

pub use engine::{EngineStats, FinalizeReason, FlowEngine};
pub use key::{Endpoint, FlowKey};
pub use state::FlowState;
