//! Transport abstraction
//!
//! The adapter only needs a duplex text channel: a sink for outbound frames
//! and a stream of inbound events. Connectors produce one per connection.

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::mpsc;

use super::room_url::RoomUrl;

/// Transport-level errors
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("invalid room URL: {0}")]
    InvalidUrl(String),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("connection closed")]
    Closed,
}

/// Events delivered by an open transport, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame from the coordinator
    Text(String),
    /// The connection ended (either side). Always the last event.
    Closed,
}

/// An open connection.
///
/// Dropping `outbound` closes the connection from our side.
#[derive(Debug)]
pub struct Duplex {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens connections to a coordinator
pub trait Connector: Send + Sync {
    /// Open a connection to `url`. Resolves once the connection is usable.
    fn open(&self, url: &RoomUrl) -> BoxFuture<'static, Result<Duplex, TransportError>>;
}
