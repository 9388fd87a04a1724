//! Wire Protocol Messages
//!
//! JSON frames exchanged with the coordinator. Inbound frames carry a `type`
//! discriminator and a `data` payload; outbound commands are flat objects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::MirroredState;

/// Errors raised while decoding or encoding protocol frames
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("playlist item has an empty video id")]
    EmptyVideoId,
}

/// A single entry of the shared playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPlaylistItem")]
pub struct PlaylistItem {
    /// Opaque video identifier
    #[serde(rename = "videoId")]
    id: String,
    title: String,
}

impl PlaylistItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Result<Self, ProtocolError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::EmptyVideoId);
        }
        Ok(Self {
            id,
            title: title.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Deserialize)]
struct RawPlaylistItem {
    #[serde(rename = "videoId")]
    video_id: String,
    #[serde(default)]
    title: String,
}

impl TryFrom<RawPlaylistItem> for PlaylistItem {
    type Error = ProtocolError;

    fn try_from(raw: RawPlaylistItem) -> Result<Self, Self::Error> {
        PlaylistItem::new(raw.video_id, raw.title)
    }
}

/// Payload of a `PLAY` broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayUpdate {
    pub index: usize,
    pub seek_offset: f64,
    /// Coordinators that run a playback clock include it; older ones omit it
    #[serde(default)]
    pub play_start_server_time: Option<f64>,
}

/// Payload of a `PAUSE` broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseUpdate {
    pub seek_offset: f64,
}

/// Payload of a `SEEK` broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeekUpdate {
    pub seek_offset: f64,
    /// Present when the room was playing at the time of the seek
    #[serde(default)]
    pub play_start_server_time: Option<f64>,
}

/// Payload of a `PONG` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PongReply {
    /// Coordinator clock in seconds
    pub server_time: f64,
}

/// Messages broadcast by the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolMessage {
    /// Full room state (sent on join and after playlist changes)
    State(MirroredState),
    /// Start playback of a playlist entry
    Play(PlayUpdate),
    /// Pause at a position
    Pause(PauseUpdate),
    /// Jump to a position, resuming if the room is playing
    Seek(SeekUpdate),
    /// Clock reply to a `PING`
    Pong(PongReply),
}

impl ProtocolMessage {
    /// Wire name of the message, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolMessage::State(_) => "STATE",
            ProtocolMessage::Play(_) => "PLAY",
            ProtocolMessage::Pause(_) => "PAUSE",
            ProtocolMessage::Seek(_) => "SEEK",
            ProtocolMessage::Pong(_) => "PONG",
        }
    }
}

/// Commands sent to the coordinator
///
/// Commands carry no client-side identifier: the coordinator decides the
/// resulting state and broadcasts it back to every client, including us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Replace the room playlist. With a `playlist_id` and no items the
    /// coordinator resolves the playlist itself.
    SetPlaylist {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        playlist_id: Option<String>,
        #[serde(default)]
        playlist: Vec<PlaylistItem>,
    },
    Play,
    Pause,
    Seek { seek_offset: f64 },
    Next,
    Prev,
    Ping,
}

/// Parse a text frame from the coordinator
pub fn decode_message(text: &str) -> Result<ProtocolMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Serialize a command into a text frame
pub fn encode_command(command: &Command) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(command)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_state() {
        let text = r#"{"type":"STATE","data":{"playlist_id":null,"playlist":[{"videoId":"dQw4w9WgXcQ","title":"Never Gonna Give You Up"}],"index":0,"is_playing":false,"play_start_server_time":null,"seek_offset":0.0}}"#;
        let msg = decode_message(text).unwrap();

        let ProtocolMessage::State(state) = msg else {
            panic!("expected STATE, got {:?}", msg);
        };
        assert_eq!(state.playlist_id, None);
        assert_eq!(state.playlist.len(), 1);
        assert_eq!(state.playlist[0].id(), "dQw4w9WgXcQ");
        assert_eq!(state.playlist[0].title(), "Never Gonna Give You Up");
        assert!(!state.is_playing);
    }

    #[test]
    fn test_decode_play_with_and_without_start_time() {
        let with = decode_message(
            r#"{"type":"PLAY","data":{"index":1,"seek_offset":12.5,"play_start_server_time":803.25}}"#,
        )
        .unwrap();
        assert_eq!(
            with,
            ProtocolMessage::Play(PlayUpdate {
                index: 1,
                seek_offset: 12.5,
                play_start_server_time: Some(803.25),
            })
        );

        let without = decode_message(r#"{"type":"PLAY","data":{"index":0,"seek_offset":0}}"#).unwrap();
        assert_eq!(
            without,
            ProtocolMessage::Play(PlayUpdate {
                index: 0,
                seek_offset: 0.0,
                play_start_server_time: None,
            })
        );
    }

    #[test]
    fn test_decode_seek_null_start_time() {
        let msg = decode_message(
            r#"{"type":"SEEK","data":{"seek_offset":42.0,"play_start_server_time":null}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ProtocolMessage::Seek(SeekUpdate {
                seek_offset: 42.0,
                play_start_server_time: None,
            })
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_message("not json").is_err());
        assert!(decode_message(r#"{"type":"PAUSE","data":{}}"#).is_err());
        assert!(decode_message(r#"{"type":"PLAY","data":{"index":-1,"seek_offset":0}}"#).is_err());
        assert!(decode_message(r#"{"type":"CHAT","data":{"text":"hi"}}"#).is_err());
    }

    #[test]
    fn test_decode_rejects_empty_video_id() {
        let text = r#"{"type":"STATE","data":{"playlist":[{"videoId":"","title":"x"}],"index":0,"is_playing":false,"seek_offset":0}}"#;
        assert!(decode_message(text).is_err());
        assert!(matches!(
            PlaylistItem::new("", "x"),
            Err(ProtocolError::EmptyVideoId)
        ));
    }

    #[test]
    fn test_encode_commands() {
        let encoded = |cmd: Command| -> serde_json::Value {
            serde_json::from_str(&encode_command(&cmd).unwrap()).unwrap()
        };

        assert_eq!(encoded(Command::Play), json!({"type": "PLAY"}));
        assert_eq!(encoded(Command::Pause), json!({"type": "PAUSE"}));
        assert_eq!(encoded(Command::Next), json!({"type": "NEXT"}));
        assert_eq!(encoded(Command::Prev), json!({"type": "PREV"}));
        assert_eq!(encoded(Command::Ping), json!({"type": "PING"}));
        assert_eq!(
            encoded(Command::Seek { seek_offset: 90.0 }),
            json!({"type": "SEEK", "seek_offset": 90.0})
        );
    }

    #[test]
    fn test_encode_set_playlist() {
        let items = vec![
            PlaylistItem::new("dQw4w9WgXcQ", "Never Gonna Give You Up").unwrap(),
            PlaylistItem::new("9bZkp7q19f0", "Gangnam Style").unwrap(),
        ];
        let text = encode_command(&Command::SetPlaylist {
            playlist_id: None,
            playlist: items,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "SET_PLAYLIST",
                "playlist": [
                    {"videoId": "dQw4w9WgXcQ", "title": "Never Gonna Give You Up"},
                    {"videoId": "9bZkp7q19f0", "title": "Gangnam Style"}
                ]
            })
        );

        let by_id = encode_command(&Command::SetPlaylist {
            playlist_id: Some("PL123".to_string()),
            playlist: Vec::new(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&by_id).unwrap();
        assert_eq!(
            value,
            json!({"type": "SET_PLAYLIST", "playlist_id": "PL123", "playlist": []})
        );
    }
}
