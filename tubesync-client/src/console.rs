//! Line-oriented command console

use std::sync::Arc;

use chrono::Local;
use parking_lot::RwLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use tubesync_core::{ConnectionAdapter, PlaylistItem, SyncError};

use crate::metrics::{format_duration, format_position, Metrics};

/// Entries shown by the `log` command
const RECENT_LOG_ENTRIES: usize = 20;

/// Playlist sent by the `demo` command
const DEMO_PLAYLIST: [(&str, &str); 2] = [
    ("dQw4w9WgXcQ", "Never Gonna Give You Up"),
    ("9bZkp7q19f0", "Gangnam Style"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Play,
    Pause,
    Next,
    Prev,
    Seek(f64),
    Playlist(String),
    Demo,
    Status,
    Log,
    Connect,
    Disconnect,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match (word.to_ascii_lowercase().as_str(), arg) {
            ("play", None) => ConsoleCommand::Play,
            ("pause", None) => ConsoleCommand::Pause,
            ("next", None) => ConsoleCommand::Next,
            ("prev", None) => ConsoleCommand::Prev,
            ("seek", Some(secs)) => {
                let secs: f64 = secs
                    .parse()
                    .map_err(|_| format!("invalid seek offset '{}'", secs))?;
                ConsoleCommand::Seek(secs)
            }
            ("seek", None) => return Err("usage: seek <secs>".to_string()),
            ("playlist", Some(id)) => ConsoleCommand::Playlist(id.to_string()),
            ("playlist", None) => return Err("usage: playlist <id>".to_string()),
            ("demo", None) => ConsoleCommand::Demo,
            ("status", None) => ConsoleCommand::Status,
            ("log", None) => ConsoleCommand::Log,
            ("connect", None) => ConsoleCommand::Connect,
            ("disconnect", None) => ConsoleCommand::Disconnect,
            ("help", None) | ("?", None) => ConsoleCommand::Help,
            ("quit", None) | ("exit", None) => ConsoleCommand::Quit,
            (other, _) => return Err(format!("unknown command '{}' (try 'help')", other)),
        };

        if words.next().is_some() {
            return Err(format!("too many arguments for '{}'", word));
        }
        Ok(Some(command))
    }
}

/// The two-item playlist used by `demo`
pub fn demo_playlist() -> Vec<PlaylistItem> {
    DEMO_PLAYLIST
        .iter()
        .filter_map(|(id, title)| PlaylistItem::new(*id, *title).ok())
        .collect()
}

/// Console bound to one adapter
pub struct Console<'a> {
    adapter: &'a ConnectionAdapter,
    metrics: Arc<RwLock<Metrics>>,
    url: String,
}

impl<'a> Console<'a> {
    pub fn new(adapter: &'a ConnectionAdapter, metrics: Arc<RwLock<Metrics>>, url: String) -> Self {
        Self {
            adapter,
            metrics,
            url,
        }
    }

    /// Read commands until `quit` or end of input
    pub async fn run<R>(&self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            match ConsoleCommand::parse(&line) {
                Ok(Some(ConsoleCommand::Quit)) => break,
                Ok(Some(command)) => {
                    if let Err(e) = self.execute(command).await {
                        warn!("Command failed: {}", e);
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{}", e),
            }
        }
        Ok(())
    }

    /// Run one command against the adapter
    pub async fn execute(&self, command: ConsoleCommand) -> Result<(), SyncError> {
        match command {
            ConsoleCommand::Play => self.adapter.request_play(),
            ConsoleCommand::Pause => self.adapter.request_pause(),
            ConsoleCommand::Next => self.adapter.next(),
            ConsoleCommand::Prev => self.adapter.prev(),
            ConsoleCommand::Seek(secs) => self.adapter.request_seek(secs),
            ConsoleCommand::Playlist(id) => self.adapter.set_playlist_by_id(id),
            ConsoleCommand::Demo => {
                info!("Sending demo playlist");
                self.adapter.set_playlist(demo_playlist())
            }
            ConsoleCommand::Connect => self.adapter.connect(&self.url).await,
            ConsoleCommand::Disconnect => {
                self.adapter.disconnect();
                Ok(())
            }
            ConsoleCommand::Status => {
                println!("{}", self.status_report());
                Ok(())
            }
            ConsoleCommand::Log => {
                println!("{}", self.recent_log(RECENT_LOG_ENTRIES));
                Ok(())
            }
            ConsoleCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            ConsoleCommand::Quit => Ok(()),
        }
    }

    /// Multi-line summary of the session
    pub fn status_report(&self) -> String {
        let state = self.adapter.state();
        let stats = self.adapter.stats();
        let metrics = self.metrics.read();

        let mut lines = vec![
            format!(
                "Status:    {} ({})",
                self.adapter.status(),
                self.adapter
                    .room_url()
                    .map(|url| url.to_string())
                    .unwrap_or_else(|| self.url.clone())
            ),
            format!("Uptime:    {}", metrics.uptime()),
        ];
        if let Some(since) = metrics.connected_at {
            let secs = Local::now().signed_duration_since(since).num_seconds();
            lines.push(format!("Connected: {}", format_duration(secs)));
        }

        match state.current_item() {
            Some(item) => lines.push(format!(
                "Video:     {} [{}] {}/{} {}",
                item.title(),
                item.id(),
                state.index + 1,
                state.playlist.len(),
                if state.is_playing { "playing" } else { "paused" }
            )),
            None => lines.push("Video:     none".to_string()),
        }
        lines.push(format!(
            "Position:  {}",
            format_position(self.adapter.estimated_position())
        ));
        if self.adapter.needs_resync() {
            lines.push("Resync:    waiting for full state".to_string());
        }

        lines.push(format!(
            "Messages:  {} in / {} out, {} malformed, {} rejected",
            stats.messages_in, stats.messages_out, stats.malformed, stats.rejected
        ));
        if let Some(rtt) = stats.rtt_ms {
            lines.push(format!("RTT:       {}ms", rtt));
        }
        lines.push(format!(
            "Player:    {} {}, {} action(s), {} error(s)",
            if metrics.playing { "playing" } else { "holding" },
            metrics.current_video.as_deref().unwrap_or("-"),
            metrics.player_actions,
            metrics.errors
        ));

        lines.join("\n")
    }

    /// The last `count` log entries, oldest first
    pub fn recent_log(&self, count: usize) -> String {
        let metrics = self.metrics.read();
        let skip = metrics.logs.len().saturating_sub(count);
        metrics
            .logs
            .iter()
            .skip(skip)
            .map(|entry| {
                format!(
                    "{} {:<6} {}",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.level.as_str(),
                    entry.message
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

const HELP: &str = "Commands:
  play | pause | next | prev    control the room
  seek <secs>                   seek the room
  playlist <id>                 load a playlist by id
  demo                          load a two-video demo playlist
  connect | disconnect          manage the connection
  status                        show session status
  log                           show recent events
  quit                          exit";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::LogLevel;
    use tubesync_core::network::MemoryConnector;
    use tubesync_core::AdapterConfig;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse("play").unwrap(), Some(ConsoleCommand::Play));
        assert_eq!(ConsoleCommand::parse("  PAUSE ").unwrap(), Some(ConsoleCommand::Pause));
        assert_eq!(
            ConsoleCommand::parse("seek 75.5").unwrap(),
            Some(ConsoleCommand::Seek(75.5))
        );
        assert_eq!(
            ConsoleCommand::parse("playlist PLdemo").unwrap(),
            Some(ConsoleCommand::Playlist("PLdemo".to_string()))
        );
        assert_eq!(ConsoleCommand::parse("log").unwrap(), Some(ConsoleCommand::Log));
        assert_eq!(ConsoleCommand::parse("exit").unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(ConsoleCommand::parse("seek").is_err());
        assert!(ConsoleCommand::parse("seek soon").is_err());
        assert!(ConsoleCommand::parse("playlist").is_err());
        assert!(ConsoleCommand::parse("play now").is_err());
        assert!(ConsoleCommand::parse("rewind").is_err());
    }

    #[test]
    fn test_demo_playlist() {
        let playlist = demo_playlist();
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist[0].id(), "dQw4w9WgXcQ");
        assert_eq!(playlist[1].title(), "Gangnam Style");
    }

    #[tokio::test]
    async fn test_console_sends_commands() {
        let (connector, mut peers) = MemoryConnector::new();
        let adapter = ConnectionAdapter::new(
            Arc::new(connector),
            AdapterConfig {
                ping_interval: None,
            },
        );
        let metrics = Arc::new(RwLock::new(Metrics::new()));
        let url = "ws://127.0.0.1:8000/ws/demo-room".to_string();
        let console = Console::new(&adapter, metrics, url);

        let input: &[u8] = b"connect\nplay\nbogus\nseek 12\nquit\npause\n";
        console.run(input).await.unwrap();

        let mut peer = peers.recv().await.unwrap();
        assert_eq!(peer.recv().await.unwrap(), r#"{"type":"PLAY"}"#);
        assert_eq!(
            peer.recv().await.unwrap(),
            r#"{"type":"SEEK","seek_offset":12.0}"#
        );
        // Nothing after quit is executed
        assert!(peer.try_recv().is_none());
        assert!(console.status_report().contains("Messages:  0 in / 2 out"));
    }

    #[tokio::test]
    async fn test_commands_fail_when_disconnected() {
        let (connector, _peers) = MemoryConnector::new();
        let adapter = ConnectionAdapter::new(Arc::new(connector), AdapterConfig::default());
        let console = Console::new(
            &adapter,
            Arc::new(RwLock::new(Metrics::new())),
            "ws://localhost/ws/x".to_string(),
        );

        assert_eq!(
            console.execute(ConsoleCommand::Play).await,
            Err(SyncError::NotConnected)
        );
        assert!(console.status_report().starts_with("Status:    disconnected"));
    }

    #[test]
    fn test_recent_log_shows_latest_entries() {
        let (connector, _peers) = MemoryConnector::new();
        let adapter = ConnectionAdapter::new(Arc::new(connector), AdapterConfig::default());
        let metrics = Arc::new(RwLock::new(Metrics::new()));
        for i in 0..5 {
            metrics.write().log(LogLevel::Info, format!("entry {}", i));
        }
        metrics.write().error("boom");
        let console = Console::new(&adapter, metrics, "ws://localhost/ws/x".to_string());

        let log = console.recent_log(2);
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("INFO   entry 4"));
        assert!(lines[1].ends_with("ERROR  boom"));
    }
}
