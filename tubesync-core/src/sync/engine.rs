//! Reconciliation Engine
//!
//! Turns coordinator broadcasts into a new mirrored state plus the ordered
//! list of player actions needed to follow it. Pure: no I/O, no clocks.
//!
//! Every message is authoritative. Applying the same message twice to the
//! same state yields the same state and the same actions, so redelivered
//! frames are harmless. Reordered frames are not, which is why the adapter
//! feeds messages through a single queue.

use thiserror::Error;

use super::protocol::{PauseUpdate, PlayUpdate, ProtocolMessage, SeekUpdate};
use super::state::MirroredState;

/// A side effect to perform against the player, in order
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    /// Load a video without starting it. Resets the player's position.
    CueVideo(String),
    /// Jump to an offset in seconds
    SeekTo { offset: f64, allow_seek_ahead: bool },
    Play,
    Pause,
}

/// The outcome of applying one message
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: MirroredState,
    pub actions: Vec<PlayerAction>,
}

/// Reasons a message cannot be reconciled
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    /// The index does not address an entry of the playlist. The mirror should
    /// be treated as stale until the next full resync.
    #[error("playlist index {index} out of bounds for {len} entries")]
    InvalidIndex { index: usize, len: usize },
}

/// Apply a coordinator message to the current mirror.
///
/// On error the current state is left as-is and no actions are produced.
pub fn apply(current: &MirroredState, message: &ProtocolMessage) -> Result<Transition, ReconcileError> {
    match message {
        ProtocolMessage::State(state) => apply_state(state),
        ProtocolMessage::Play(update) => apply_play(current, update),
        ProtocolMessage::Pause(update) => Ok(apply_pause(current, update)),
        ProtocolMessage::Seek(update) => Ok(apply_seek(current, update)),
        ProtocolMessage::Pong(_) => Ok(Transition {
            state: current.clone(),
            actions: Vec::new(),
        }),
    }
}

/// Full resync: replace everything, cue the current entry, hold if paused.
///
/// No seek is issued here; the cued video starts from its default position.
fn apply_state(state: &MirroredState) -> Result<Transition, ReconcileError> {
    check_index(state, state.index)?;

    let mut actions = Vec::with_capacity(2);
    if let Some(item) = state.current_item() {
        actions.push(PlayerAction::CueVideo(item.id().to_string()));
    }
    if !state.is_playing {
        actions.push(PlayerAction::Pause);
    }

    Ok(Transition {
        state: state.clone(),
        actions,
    })
}

/// Start an entry at an offset.
///
/// The offset is applied to the player but not stored in the mirror: while
/// playing, position is derived from `play_start_server_time`.
fn apply_play(current: &MirroredState, update: &PlayUpdate) -> Result<Transition, ReconcileError> {
    let item = current
        .playlist
        .get(update.index)
        .ok_or(ReconcileError::InvalidIndex {
            index: update.index,
            len: current.playlist.len(),
        })?;

    let mut state = current.clone();
    state.index = update.index;
    state.is_playing = true;
    // Set only from this message; absent means no running clock
    state.play_start_server_time = update.play_start_server_time;

    // Cueing resets the player position, so always seek afterwards
    let actions = vec![
        PlayerAction::CueVideo(item.id().to_string()),
        PlayerAction::SeekTo {
            offset: update.seek_offset,
            allow_seek_ahead: true,
        },
        PlayerAction::Play,
    ];

    Ok(Transition { state, actions })
}

fn apply_pause(current: &MirroredState, update: &PauseUpdate) -> Transition {
    let mut state = current.clone();
    state.is_playing = false;
    state.seek_offset = update.seek_offset;
    state.play_start_server_time = None;

    Transition {
        state,
        actions: vec![
            PlayerAction::Pause,
            PlayerAction::SeekTo {
                offset: update.seek_offset,
                allow_seek_ahead: true,
            },
        ],
    }
}

fn apply_seek(current: &MirroredState, update: &SeekUpdate) -> Transition {
    let mut state = current.clone();
    state.seek_offset = update.seek_offset;
    state.play_start_server_time = update.play_start_server_time;

    let mut actions = vec![PlayerAction::SeekTo {
        offset: update.seek_offset,
        allow_seek_ahead: true,
    }];
    // A running clock means the room is playing
    if update.play_start_server_time.is_some() {
        actions.push(PlayerAction::Play);
    }

    Transition { state, actions }
}

fn check_index(state: &MirroredState, index: usize) -> Result<(), ReconcileError> {
    if state.is_valid_index(index) {
        Ok(())
    } else {
        Err(ReconcileError::InvalidIndex {
            index,
            len: state.playlist.len(),
        })
    }
}
