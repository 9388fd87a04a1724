//! Room session
//!
//! The connection adapter: transport lifecycle, inbound message dispatch,
//! player execution, and the outbound command API.

mod adapter;
mod handlers;
mod types;

pub use adapter::ConnectionAdapter;
pub use types::*;
