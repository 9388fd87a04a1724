//! Room URL Parsing
//!
//! Coordinators serve each room at `ws[s]://host[:port]/ws/<room_id>`.

use std::fmt;
use url::Url;

use super::transport::TransportError;

/// Path segment that precedes the room id
const ROOM_PATH_PREFIX: &str = "ws";

/// A validated WebSocket URL pointing at a coordinator room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomUrl(Url);

impl RoomUrl {
    /// Parse a room URL from user input.
    ///
    /// Surrounding whitespace is ignored and a missing scheme defaults to
    /// `ws://`. Only `ws` and `wss` are accepted.
    pub fn parse(input: &str) -> Result<Self, TransportError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TransportError::InvalidUrl("empty URL".to_string()));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("ws://{}", trimmed)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| TransportError::InvalidUrl(format!("{} ({})", trimmed, e)))?;

        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme '{}', expected ws or wss",
                    other
                )))
            }
        }
        if url.host_str().is_none() {
            return Err(TransportError::InvalidUrl(format!("{} has no host", trimmed)));
        }

        Ok(RoomUrl(url))
    }

    /// Build the URL of a room on a coordinator, e.g. `ws://host:8000` + `demo-room`
    pub fn for_room(base: &str, room_id: &str) -> Result<Self, TransportError> {
        let base = RoomUrl::parse(base)?;
        let mut url = base.0;
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl("base URL cannot have a path".to_string()))?
            .clear()
            .push(ROOM_PATH_PREFIX)
            .push(room_id);
        Ok(RoomUrl(url))
    }

    /// The room id encoded in the path, if the URL follows the `/ws/<room_id>` layout
    pub fn room_id(&self) -> Option<&str> {
        let mut segments = self.0.path_segments()?.filter(|s| !s.is_empty());
        match (segments.next(), segments.next(), segments.next()) {
            (Some(ROOM_PATH_PREFIX), Some(room), None) => Some(room),
            _ => None,
        }
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RoomUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
