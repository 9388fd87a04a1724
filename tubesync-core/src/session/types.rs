//! Session types: status, errors, observer interface, configuration

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::network::TransportError;
use crate::sync::{MirroredState, ProtocolError, ReconcileError};

/// Default interval between clock pings
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(12);

/// Errors surfaced by the connection adapter. None of them are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// An inbound frame could not be parsed; it was dropped
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The mirror and the coordinator disagree about the playlist; the
    /// message was dropped and the mirror waits for the next resync
    #[error("playlist index {index} out of bounds for {len} entries")]
    InvalidIndex { index: usize, len: usize },

    #[error("not connected")]
    NotConnected,

    /// The connection went away while sending
    #[error("connection closed")]
    TransportClosed,

    #[error("transport error: {0}")]
    Transport(String),

    /// A newer connect call replaced this one before it finished
    #[error("connection attempt superseded")]
    Superseded,

    #[error("invalid seek offset: {0}")]
    InvalidSeekOffset(f64),
}

impl From<ReconcileError> for SyncError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::InvalidIndex { index, len } => SyncError::InvalidIndex { index, len },
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(e: ProtocolError) -> Self {
        SyncError::MalformedMessage(e.to_string())
    }
}

impl From<TransportError> for SyncError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Closed => SyncError::TransportClosed,
            other => SyncError::Transport(other.to_string()),
        }
    }
}

/// Connection lifecycle: `Disconnected -> Connecting -> Connected -> Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback interface for session events.
///
/// Called from the adapter's tasks. State changes arrive in processing order
/// while the adapter's reentrant processing turn is held; no other adapter
/// lock is held, so implementations may call back into the adapter.
pub trait SyncObserver: Send + Sync {
    fn on_status_changed(&self, _status: ConnectionStatus) {}
    /// The mirror changed after an inbound message or a teardown
    fn on_state_changed(&self, _state: &MirroredState) {}
    fn on_error(&self, _error: &SyncError) {}
}

/// Adapter configuration
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// How often to ping the coordinator for clock estimation.
    /// `None` disables pinging.
    pub ping_interval: Option<Duration>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            ping_interval: Some(DEFAULT_PING_INTERVAL),
        }
    }
}

/// Traffic counters for the current connection
#[derive(Debug, Clone, Default)]
pub struct AdapterStats {
    pub messages_in: u64,
    pub messages_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    /// Inbound frames dropped as unparseable
    pub malformed: u64,
    /// Inbound messages rejected for an invalid index
    pub rejected: u64,
    pub connected_since: Option<Instant>,
    pub last_message_at: Option<Instant>,
    /// Latest averaged round-trip time to the coordinator
    pub rtt_ms: Option<u64>,
}

impl AdapterStats {
    pub(crate) fn record_incoming(&mut self, bytes: usize) {
        self.messages_in += 1;
        self.bytes_in += bytes as u64;
        self.last_message_at = Some(Instant::now());
    }

    pub(crate) fn record_outgoing(&mut self, bytes: usize) {
        self.messages_out += 1;
        self.bytes_out += bytes as u64;
    }

    /// Seconds the current connection has been up
    pub fn connected_secs(&self) -> Option<f32> {
        self.connected_since.map(|t| t.elapsed().as_secs_f32())
    }

    /// Seconds since the last inbound frame
    pub fn last_message_age(&self) -> Option<f32> {
        self.last_message_at.map(|t| t.elapsed().as_secs_f32())
    }
}
