//! Player capability
//!
//! The video engine the adapter drives. Implementations wrap whatever actually
//! renders video (an embedded iframe player, a native decoder, a log).

use parking_lot::Mutex;

use crate::sync::PlayerAction;

/// Control surface of a video player
pub trait Player: Send + Sync {
    /// Load a video without starting it
    fn cue_video(&self, video_id: &str);

    /// Jump to `offset_secs`. With `allow_seek_ahead` the player may fetch
    /// data past what it has buffered.
    fn seek_to(&self, offset_secs: f64, allow_seek_ahead: bool);

    fn play(&self);

    fn pause(&self);
}

/// Perform one action against a player
pub fn perform(player: &dyn Player, action: &PlayerAction) {
    match action {
        PlayerAction::CueVideo(id) => player.cue_video(id),
        PlayerAction::SeekTo {
            offset,
            allow_seek_ahead,
        } => player.seek_to(*offset, *allow_seek_ahead),
        PlayerAction::Play => player.play(),
        PlayerAction::Pause => player.pause(),
    }
}

/// A player that only records what it was asked to do
#[derive(Debug, Default)]
pub struct RecordingPlayer {
    actions: Mutex<Vec<PlayerAction>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything performed so far, in order
    pub fn actions(&self) -> Vec<PlayerAction> {
        self.actions.lock().clone()
    }

    /// Take and clear the recorded actions
    pub fn take(&self) -> Vec<PlayerAction> {
        std::mem::take(&mut *self.actions.lock())
    }
}

impl Player for RecordingPlayer {
    fn cue_video(&self, video_id: &str) {
        self.actions
            .lock()
            .push(PlayerAction::CueVideo(video_id.to_string()));
    }

    fn seek_to(&self, offset_secs: f64, allow_seek_ahead: bool) {
        self.actions.lock().push(PlayerAction::SeekTo {
            offset: offset_secs,
            allow_seek_ahead,
        });
    }

    fn play(&self) {
        self.actions.lock().push(PlayerAction::Play);
    }

    fn pause(&self) {
        self.actions.lock().push(PlayerAction::Pause);
    }
}
