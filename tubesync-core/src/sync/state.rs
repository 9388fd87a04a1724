//! Mirrored Room State

use serde::{Deserialize, Serialize};

use super::protocol::PlaylistItem;

/// The client's best-known copy of the coordinator's room state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirroredState {
    /// Active playlist generation; absent until the first resync
    #[serde(default)]
    pub playlist_id: Option<String>,
    /// Playback order
    #[serde(default)]
    pub playlist: Vec<PlaylistItem>,
    /// Current entry; `index < playlist.len()` whenever the playlist is non-empty
    pub index: usize,
    pub is_playing: bool,
    /// Coordinator clock (seconds) at which the current segment began.
    /// Only set while playing with a running clock.
    #[serde(default)]
    pub play_start_server_time: Option<f64>,
    /// Position in seconds when the state was last captured
    pub seek_offset: f64,
}

impl MirroredState {
    /// Create the empty state used before the first resync
    pub fn new() -> Self {
        Self::default()
    }

    /// The playlist entry at `index`, if any
    pub fn current_item(&self) -> Option<&PlaylistItem> {
        self.playlist.get(self.index)
    }

    /// Whether `index` addresses an entry of this playlist.
    /// Any index is accepted for an empty playlist since there is nothing to cue.
    pub fn is_valid_index(&self, index: usize) -> bool {
        self.playlist.is_empty() || index < self.playlist.len()
    }

    /// Estimate the playback position at coordinator time `server_now`.
    ///
    /// While playing with a running clock this is `seek_offset` plus the time
    /// elapsed since `play_start_server_time`; otherwise it is `seek_offset`.
    /// The result is never negative.
    pub fn position_at(&self, server_now: f64) -> f64 {
        match (self.is_playing, self.play_start_server_time) {
            (true, Some(started)) => (self.seek_offset + (server_now - started)).max(0.0),
            _ => self.seek_offset.max(0.0),
        }
    }
}
