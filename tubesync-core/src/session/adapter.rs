//! Connection adapter
//!
//! Owns one coordinator connection at a time, feeds inbound messages through
//! the reconciliation engine, drives the player, and turns user intent into
//! outbound commands.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::clock::{self, SharedServerClock};
use crate::network::{Connector, Duplex, RoomUrl, WebSocketConnector};
use crate::player::Player;
use crate::sync::{encode_command, Command, MirroredState, PlaylistItem};

use super::handlers;
use super::types::*;

/// Connection slot. Every connect/teardown bumps `generation`, so tasks of an
/// older connection can tell they are stale.
#[derive(Default)]
struct Link {
    generation: u64,
    status: ConnectionStatus,
    outbound: Option<mpsc::UnboundedSender<String>>,
    url: Option<RoomUrl>,
}

impl Link {
    /// Move to `status`; returns it if this was a change
    fn transition(&mut self, status: ConnectionStatus) -> Option<ConnectionStatus> {
        if self.status == status {
            None
        } else {
            self.status = status;
            Some(status)
        }
    }
}

#[derive(Default)]
pub(super) struct Mirror {
    pub(super) state: MirroredState,
    /// Set when a message was rejected; cleared by the next full resync
    pub(super) needs_resync: bool,
}

/// State shared between the adapter and its background tasks
pub(super) struct AdapterInner {
    config: AdapterConfig,
    connector: Arc<dyn Connector>,
    link: Mutex<Link>,
    pub(super) mirror: Mutex<Mirror>,
    /// Held while a message is applied, its actions performed and observers
    /// told, and while a session is reset. Reentrant so player and observer
    /// callbacks may call back into the adapter.
    pub(super) processing: ReentrantMutex<()>,
    pub(super) player: RwLock<Option<Arc<dyn Player>>>,
    observer: RwLock<Option<Arc<dyn SyncObserver>>>,
    pub(super) clock: SharedServerClock,
    pub(super) stats: Mutex<AdapterStats>,
}

impl AdapterInner {
    fn begin_attempt(&self, url: &RoomUrl) -> u64 {
        let (generation, changed) = {
            let mut link = self.link.lock();
            link.generation += 1;
            // Dropping the sender closes any previous connection
            link.outbound = None;
            link.url = Some(url.clone());
            (link.generation, link.transition(ConnectionStatus::Connecting))
        };
        self.reset_session();
        if let Some(status) = changed {
            self.notify_status(status);
        }
        generation
    }

    /// Install a freshly opened connection. False if a newer attempt or a
    /// disconnect happened meanwhile.
    fn finish_attempt(&self, generation: u64, outbound: mpsc::UnboundedSender<String>) -> bool {
        let changed = {
            let mut link = self.link.lock();
            if link.generation != generation {
                return false;
            }
            link.outbound = Some(outbound);
            link.transition(ConnectionStatus::Connected)
        };
        *self.stats.lock() = AdapterStats {
            connected_since: Some(Instant::now()),
            ..AdapterStats::default()
        };
        if let Some(status) = changed {
            self.notify_status(status);
        }
        true
    }

    /// Tear down the connection of `generation`, or whatever is current when
    /// `None`. Returns false if `generation` is no longer current.
    pub(super) fn end_link(&self, generation: Option<u64>) -> bool {
        let changed = {
            let mut link = self.link.lock();
            match generation {
                Some(g) if g != link.generation => return false,
                Some(_) => {}
                None => link.generation += 1,
            }
            link.outbound = None;
            link.url = None;
            link.transition(ConnectionStatus::Disconnected)
        };
        self.stats.lock().connected_since = None;
        self.reset_session();
        if let Some(status) = changed {
            self.notify_status(status);
        }
        true
    }

    pub(super) fn is_current(&self, generation: u64) -> bool {
        self.link.lock().generation == generation
    }

    /// Mirrored state and clock samples belong to one connection
    fn reset_session(&self) {
        // Waits out a message still being processed for the old connection
        let _turn = self.processing.lock();
        self.clock.write().clear();
        let cleared = {
            let mut mirror = self.mirror.lock();
            let had_state = mirror.state != MirroredState::default();
            *mirror = Mirror::default();
            had_state
        };
        if cleared {
            self.notify_state(&MirroredState::default());
        }
    }

    pub(super) fn send(&self, command: &Command) -> Result<(), SyncError> {
        let outbound = {
            let link = self.link.lock();
            if link.status != ConnectionStatus::Connected {
                return Err(SyncError::NotConnected);
            }
            link.outbound.clone().ok_or(SyncError::NotConnected)?
        };

        let text = encode_command(command)?;
        let len = text.len();
        outbound
            .send(text)
            .map_err(|_| SyncError::TransportClosed)?;
        self.stats.lock().record_outgoing(len);
        debug!("Sent {:?}", command);
        Ok(())
    }

    fn observer(&self) -> Option<Arc<dyn SyncObserver>> {
        self.observer.read().clone()
    }

    fn notify_status(&self, status: ConnectionStatus) {
        debug!("Connection status: {}", status);
        if let Some(observer) = self.observer() {
            observer.on_status_changed(status);
        }
    }

    pub(super) fn notify_state(&self, state: &MirroredState) {
        if let Some(observer) = self.observer() {
            observer.on_state_changed(state);
        }
    }

    pub(super) fn notify_error(&self, error: &SyncError) {
        if let Some(observer) = self.observer() {
            observer.on_error(error);
        }
    }
}

/// Client side of a shared-playback room
pub struct ConnectionAdapter {
    inner: Arc<AdapterInner>,
}

impl ConnectionAdapter {
    /// Create an adapter that opens connections through `connector`
    pub fn new(connector: Arc<dyn Connector>, config: AdapterConfig) -> Self {
        Self {
            inner: Arc::new(AdapterInner {
                config,
                connector,
                link: Mutex::new(Link::default()),
                mirror: Mutex::new(Mirror::default()),
                processing: ReentrantMutex::new(()),
                player: RwLock::new(None),
                observer: RwLock::new(None),
                clock: clock::new_shared_clock(),
                stats: Mutex::new(AdapterStats::default()),
            }),
        }
    }

    /// Create an adapter that connects over WebSocket
    pub fn websocket(config: AdapterConfig) -> Self {
        Self::new(Arc::new(WebSocketConnector::new()), config)
    }

    /// Attach the player that inbound messages drive
    pub fn set_player(&self, player: Arc<dyn Player>) {
        *self.inner.player.write() = Some(player);
    }

    /// Detach the player. Actions still queued for the current message are skipped.
    pub fn release_player(&self) {
        *self.inner.player.write() = None;
    }

    /// Set the event observer
    pub fn set_observer(&self, observer: Arc<dyn SyncObserver>) {
        *self.inner.observer.write() = Some(observer);
    }

    /// Connect to a room.
    ///
    /// Any existing or pending connection is replaced; a superseded call
    /// returns [`SyncError::Superseded`]. There is no automatic retry.
    #[instrument(skip(self))]
    pub async fn connect(&self, url: &str) -> Result<(), SyncError> {
        let url = RoomUrl::parse(url)?;
        let generation = self.inner.begin_attempt(&url);
        info!("Connecting to {}", url);

        match self.inner.connector.open(&url).await {
            Ok(Duplex { outbound, inbound }) => {
                if !self.inner.finish_attempt(generation, outbound) {
                    debug!("Connection attempt {} superseded", generation);
                    return Err(SyncError::Superseded);
                }
                info!("Connected to {}", url);

                tokio::spawn(handlers::run_inbound(
                    Arc::clone(&self.inner),
                    generation,
                    inbound,
                ));
                if let Some(every) = self.inner.config.ping_interval {
                    tokio::spawn(handlers::run_pings(
                        Arc::clone(&self.inner),
                        generation,
                        every,
                    ));
                }
                Ok(())
            }
            Err(e) => {
                if !self.inner.end_link(Some(generation)) {
                    return Err(SyncError::Superseded);
                }
                warn!("Failed to connect to {}: {}", url, e);
                let err = SyncError::from(e);
                self.inner.notify_error(&err);
                Err(err)
            }
        }
    }

    /// Close the current connection (or abandon a pending one)
    pub fn disconnect(&self) {
        if self.status() != ConnectionStatus::Disconnected {
            info!("Disconnecting");
        }
        self.inner.end_link(None);
    }

    /// Send a command to the coordinator
    pub fn send(&self, command: Command) -> Result<(), SyncError> {
        self.inner.send(&command)
    }

    pub fn request_play(&self) -> Result<(), SyncError> {
        self.send(Command::Play)
    }

    pub fn request_pause(&self) -> Result<(), SyncError> {
        self.send(Command::Pause)
    }

    /// Ask the coordinator to seek. Negative offsets are clamped to zero.
    pub fn request_seek(&self, offset_secs: f64) -> Result<(), SyncError> {
        if !offset_secs.is_finite() {
            return Err(SyncError::InvalidSeekOffset(offset_secs));
        }
        self.send(Command::Seek {
            seek_offset: offset_secs.max(0.0),
        })
    }

    /// Replace the room playlist
    pub fn set_playlist(&self, items: Vec<PlaylistItem>) -> Result<(), SyncError> {
        self.send(Command::SetPlaylist {
            playlist_id: None,
            playlist: items,
        })
    }

    /// Replace the room playlist with one the coordinator resolves by id
    pub fn set_playlist_by_id(&self, playlist_id: impl Into<String>) -> Result<(), SyncError> {
        self.send(Command::SetPlaylist {
            playlist_id: Some(playlist_id.into()),
            playlist: Vec::new(),
        })
    }

    pub fn next(&self) -> Result<(), SyncError> {
        self.send(Command::Next)
    }

    pub fn prev(&self) -> Result<(), SyncError> {
        self.send(Command::Prev)
    }

    /// Feed one raw inbound frame to the current connection.
    ///
    /// Connection tasks do this for every text frame; it is public for
    /// transports driven from outside. Malformed frames are dropped without
    /// touching the mirror. Fails with [`SyncError::NotConnected`] unless
    /// connected, since the mirror only exists for a live connection.
    pub fn on_message(&self, raw: &str) -> Result<(), SyncError> {
        let generation = {
            let link = self.inner.link.lock();
            if link.status != ConnectionStatus::Connected {
                return Err(SyncError::NotConnected);
            }
            link.generation
        };
        handlers::handle_text(&self.inner, generation, raw)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.link.lock().status
    }

    /// URL of the current or pending connection
    pub fn room_url(&self) -> Option<RoomUrl> {
        self.inner.link.lock().url.clone()
    }

    /// Snapshot of the mirrored room state
    pub fn state(&self) -> MirroredState {
        self.inner.mirror.lock().state.clone()
    }

    /// True after a message was rejected, until the next full resync
    pub fn needs_resync(&self) -> bool {
        self.inner.mirror.lock().needs_resync
    }

    pub fn stats(&self) -> AdapterStats {
        self.inner.stats.lock().clone()
    }

    /// Best estimate of the room's live playback position in seconds.
    ///
    /// Uses the coordinator clock estimate when one exists; otherwise falls
    /// back to the last captured offset.
    pub fn estimated_position(&self) -> f64 {
        let state = self.state();
        match self.inner.clock.read().estimate_server_now() {
            Some(server_now) => state.position_at(server_now),
            None => state.seek_offset,
        }
    }
}

impl Drop for ConnectionAdapter {
    fn drop(&mut self) {
        self.inner.end_link(None);
    }
}
