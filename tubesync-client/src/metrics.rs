//! Session metrics for the headless client

use chrono::{DateTime, Local};
use std::collections::VecDeque;

use tubesync_core::{ConnectionStatus, PlayerAction};

/// Maximum number of log entries to keep
const MAX_LOG_ENTRIES: usize = 100;

/// A recorded event
#[derive(Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    Info,
    Error,
    Connection,
    Player,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
            LogLevel::Connection => "CONN",
            LogLevel::Player => "PLAYER",
        }
    }
}

/// Client metrics
pub struct Metrics {
    /// Client start time
    pub start_time: DateTime<Local>,

    /// Current connection status
    pub status: ConnectionStatus,

    /// When the current connection came up
    pub connected_at: Option<DateTime<Local>>,

    /// Video currently cued in the player
    pub current_video: Option<String>,

    /// Whether the player was last told to play
    pub playing: bool,

    /// Player actions performed since start
    pub player_actions: u64,

    /// Errors surfaced by the session
    pub errors: u64,

    /// Log entries
    pub logs: VecDeque<LogEntry>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Local::now(),
            status: ConnectionStatus::Disconnected,
            connected_at: None,
            current_video: None,
            playing: false,
            player_actions: 0,
            errors: 0,
            logs: VecDeque::with_capacity(MAX_LOG_ENTRIES),
        }
    }

    /// Add a log entry
    pub fn log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.logs.len() >= MAX_LOG_ENTRIES {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            timestamp: Local::now(),
            level,
            message: message.into(),
        });
    }

    /// Record a connection status change
    pub fn status_changed(&mut self, status: ConnectionStatus) {
        self.status = status;
        self.connected_at = match status {
            ConnectionStatus::Connected => Some(Local::now()),
            _ => None,
        };
        self.log(LogLevel::Connection, format!("Status: {}", status));
    }

    /// Record an action the player performed
    pub fn player_action(&mut self, action: &PlayerAction) {
        self.player_actions += 1;
        let message = match action {
            PlayerAction::CueVideo(id) => {
                self.current_video = Some(id.clone());
                self.playing = false;
                format!("Cue {}", id)
            }
            PlayerAction::SeekTo { offset, .. } => format!("Seek to {}", format_position(*offset)),
            PlayerAction::Play => {
                self.playing = true;
                "Play".to_string()
            }
            PlayerAction::Pause => {
                self.playing = false;
                "Pause".to_string()
            }
        };
        self.log(LogLevel::Player, message);
    }

    /// Record a session error
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        self.log(LogLevel::Error, message);
    }

    /// Get uptime as formatted string
    pub fn uptime(&self) -> String {
        let duration = Local::now().signed_duration_since(self.start_time);
        format_duration(duration.num_seconds())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Format whole seconds as `42s`, `3m 5s` or `2h 10m`
pub fn format_duration(secs: i64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    }
}

/// Format a playback position as `m:ss.s`
pub fn format_position(secs: f64) -> String {
    let secs = secs.max(0.0);
    let mins = (secs / 60.0).floor();
    format!("{}:{:04.1}", mins as u64, secs - mins * 60.0)
}
