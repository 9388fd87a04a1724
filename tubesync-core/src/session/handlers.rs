//! Inbound message handling and connection tasks

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::network::TransportEvent;
use crate::player::perform;
use crate::sync::{self, decode_message, Command, PlayerAction, ProtocolMessage};

use super::adapter::AdapterInner;
use super::types::SyncError;

/// Parse, reconcile, and act on one inbound frame of connection `generation`.
///
/// Frames of a connection that is no longer current are dropped once the
/// processing turn is held, so teardown never races an in-flight message.
pub(super) fn handle_text(
    inner: &AdapterInner,
    generation: u64,
    text: &str,
) -> Result<(), SyncError> {
    inner.stats.lock().record_incoming(text.len());

    let message = match decode_message(text) {
        Ok(message) => message,
        Err(e) => {
            inner.stats.lock().malformed += 1;
            warn!("Dropping malformed message: {}", e);
            return Err(e.into());
        }
    };
    debug!("Received {}", message.kind());

    // One message at a time, from apply through the last observer call.
    // Teardown takes the same turn before discarding the mirror.
    let _turn = inner.processing.lock();
    if !inner.is_current(generation) {
        debug!("Dropping {} from stale connection {}", message.kind(), generation);
        return Ok(());
    }

    if let ProtocolMessage::Pong(pong) = &message {
        let mut clock = inner.clock.write();
        if clock.handle_pong(pong.server_time).is_some() {
            inner.stats.lock().rtt_ms = clock.rtt_ms();
        } else {
            debug!("Unsolicited PONG ignored");
        }
        return Ok(());
    }

    let transition = {
        let mut mirror = inner.mirror.lock();
        match sync::apply(&mirror.state, &message) {
            Ok(transition) => {
                if matches!(message, ProtocolMessage::State(_)) {
                    mirror.needs_resync = false;
                }
                mirror.state = transition.state.clone();
                transition
            }
            Err(e) => {
                mirror.needs_resync = true;
                drop(mirror);
                inner.stats.lock().rejected += 1;
                warn!("Rejected {}: {}; waiting for resync", message.kind(), e);
                return Err(e.into());
            }
        }
    };

    execute(inner, generation, &transition.actions);

    // A player callback may have torn the connection down
    if inner.is_current(generation) {
        inner.notify_state(&transition.state);
    }
    Ok(())
}

/// Perform actions in order, stopping if the player goes away or the
/// connection is torn down midway
fn execute(inner: &AdapterInner, generation: u64, actions: &[PlayerAction]) {
    for (done, action) in actions.iter().enumerate() {
        if !inner.is_current(generation) {
            debug!(
                "Connection {} ended; skipping {} action(s)",
                generation,
                actions.len() - done
            );
            return;
        }
        let Some(player) = inner.player.read().clone() else {
            debug!(
                "No player attached; skipping {} action(s)",
                actions.len() - done
            );
            return;
        };
        debug!("Player: {:?}", action);
        perform(player.as_ref(), action);
    }
}

/// Drain one connection's inbound events until it closes or is superseded
pub(super) async fn run_inbound(
    inner: Arc<AdapterInner>,
    generation: u64,
    mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = inbound.recv().await {
        if !inner.is_current(generation) {
            debug!("Connection {} superseded, dropping its events", generation);
            return;
        }
        match event {
            TransportEvent::Text(text) => {
                if let Err(e) = handle_text(&inner, generation, &text) {
                    inner.notify_error(&e);
                }
            }
            TransportEvent::Closed => break,
        }
    }

    if inner.end_link(Some(generation)) {
        info!("Connection closed");
    }
}

/// Periodically ping the coordinator for clock estimation
pub(super) async fn run_pings(inner: Arc<AdapterInner>, generation: u64, every: Duration) {
    loop {
        tokio::time::sleep(every).await;
        if !inner.is_current(generation) {
            break;
        }
        inner.clock.write().record_ping();
        if let Err(e) = inner.send(&Command::Ping) {
            debug!("Ping loop stopping: {}", e);
            break;
        }
    }
}
