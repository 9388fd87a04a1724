//! TubeSync - Core Library
//!
//! Client side of a shared-playback room: mirrors the coordinator's playlist
//! state, turns its broadcasts into player actions, and sends user intent
//! back as commands.

pub mod clock;
pub mod network;
pub mod player;
pub mod session;
pub mod sync;

// Re-exports for convenience
pub use network::{Connector, RoomUrl, WebSocketConnector};
pub use player::Player;
pub use session::{AdapterConfig, ConnectionAdapter, ConnectionStatus, SyncError, SyncObserver};
pub use sync::{apply, Command, MirroredState, PlayerAction, PlaylistItem, ProtocolMessage};
