//! Coordinator Connectivity
//!
//! A transport abstraction plus the WebSocket connector used in production
//! and an in-process connector for tests.

mod memory;
mod room_url;
mod transport;
mod websocket;

pub use memory::{MemoryConnector, MemoryPeer};
pub use room_url::RoomUrl;
pub use transport::{Connector, Duplex, TransportError, TransportEvent};
pub use websocket::WebSocketConnector;
