//! Sync Engine
//!
//! Wire protocol, mirrored room state, and the reconciliation engine that
//! maps coordinator broadcasts onto player actions.

mod engine;
mod protocol;
mod state;

pub use engine::*;
pub use protocol::*;
pub use state::*;
