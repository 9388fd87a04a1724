//! Player and observer hooks that feed the client metrics

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use tubesync_core::{
    ConnectionStatus, MirroredState, Player, PlayerAction, SyncError, SyncObserver,
};

use crate::metrics::{format_position, LogLevel, Metrics};

/// Headless player: logs what a real player would do
pub struct LoggingPlayer {
    metrics: Arc<RwLock<Metrics>>,
}

impl LoggingPlayer {
    pub fn new(metrics: Arc<RwLock<Metrics>>) -> Self {
        Self { metrics }
    }

    fn record(&self, action: PlayerAction) {
        self.metrics.write().player_action(&action);
    }
}

impl Player for LoggingPlayer {
    fn cue_video(&self, video_id: &str) {
        info!("Cue {}", video_id);
        self.record(PlayerAction::CueVideo(video_id.to_string()));
    }

    fn seek_to(&self, offset: f64, allow_seek_ahead: bool) {
        info!("Seek to {}", format_position(offset));
        self.record(PlayerAction::SeekTo {
            offset,
            allow_seek_ahead,
        });
    }

    fn play(&self) {
        info!("Play");
        self.record(PlayerAction::Play);
    }

    fn pause(&self) {
        info!("Pause");
        self.record(PlayerAction::Pause);
    }
}

/// Mirrors session events into the metrics log
pub struct MetricsObserver {
    metrics: Arc<RwLock<Metrics>>,
}

impl MetricsObserver {
    pub fn new(metrics: Arc<RwLock<Metrics>>) -> Self {
        Self { metrics }
    }
}

impl SyncObserver for MetricsObserver {
    fn on_status_changed(&self, status: ConnectionStatus) {
        info!("Status: {}", status);
        self.metrics.write().status_changed(status);
    }

    fn on_state_changed(&self, state: &MirroredState) {
        let now_playing = state
            .current_item()
            .map(|item| format!("{} ({})", item.title(), item.id()))
            .unwrap_or_else(|| "nothing".to_string());
        let message = format!(
            "Room: {} item(s), {} {}",
            state.playlist.len(),
            if state.is_playing { "playing" } else { "paused on" },
            now_playing
        );
        self.metrics.write().log(LogLevel::Info, message);
    }

    fn on_error(&self, error: &SyncError) {
        warn!("Session error: {}", error);
        self.metrics.write().error(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubesync_core::PlaylistItem;

    fn shared() -> Arc<RwLock<Metrics>> {
        Arc::new(RwLock::new(Metrics::new()))
    }

    #[test]
    fn test_logging_player_records_actions() {
        let metrics = shared();
        let player = LoggingPlayer::new(metrics.clone());

        player.cue_video("dQw4w9WgXcQ");
        player.seek_to(30.0, true);
        player.play();

        let metrics = metrics.read();
        assert_eq!(metrics.player_actions, 3);
        assert_eq!(metrics.current_video.as_deref(), Some("dQw4w9WgXcQ"));
        assert!(metrics.playing);
    }

    #[test]
    fn test_observer_tracks_status_and_errors() {
        let metrics = shared();
        let observer = MetricsObserver::new(metrics.clone());

        observer.on_status_changed(ConnectionStatus::Connected);
        observer.on_error(&SyncError::NotConnected);

        let mut state = MirroredState::new();
        state.playlist = vec![PlaylistItem::new("A", "Video A").unwrap()];
        observer.on_state_changed(&state);

        let metrics = metrics.read();
        assert_eq!(metrics.status, ConnectionStatus::Connected);
        assert_eq!(metrics.errors, 1);
        assert_eq!(
            metrics.logs.back().unwrap().message,
            "Room: 1 item(s), paused on Video A (A)"
        );
    }
}
