//! In-process connector
//!
//! Every successful `open` hands the far end of the duplex to the owner of
//! the connector as a [`MemoryPeer`], which plays the coordinator's role.
//! Used by tests and by embedders that run a coordinator in the same process.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use super::room_url::RoomUrl;
use super::transport::{Connector, Duplex, TransportError, TransportEvent};

#[derive(Default)]
struct MemoryInner {
    /// Number of upcoming opens to refuse
    refusals: usize,
    /// Gates that hold upcoming opens until released
    gates: VecDeque<oneshot::Receiver<()>>,
}

/// Connector whose connections terminate in this process
#[derive(Clone)]
pub struct MemoryConnector {
    inner: Arc<Mutex<MemoryInner>>,
    peers: mpsc::UnboundedSender<MemoryPeer>,
}

impl MemoryConnector {
    /// Create a connector and the receiver on which accepted peers arrive
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (peers, peer_rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Arc::new(Mutex::new(MemoryInner::default())),
                peers,
            },
            peer_rx,
        )
    }

    /// Make the next open fail
    pub fn refuse_next(&self) {
        self.inner.lock().refusals += 1;
    }

    /// Hold the next open until the returned sender fires (or is dropped)
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().gates.push_back(rx);
        tx
    }
}

impl Connector for MemoryConnector {
    fn open(&self, url: &RoomUrl) -> BoxFuture<'static, Result<Duplex, TransportError>> {
        let (refuse, gate) = {
            let mut inner = self.inner.lock();
            let refuse = inner.refusals > 0;
            if refuse {
                inner.refusals -= 1;
            }
            (refuse, inner.gates.pop_front())
        };
        let peers = self.peers.clone();
        let url = url.clone();

        Box::pin(async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if refuse {
                return Err(TransportError::Connect(format!("{} refused", url)));
            }

            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            let peer = MemoryPeer {
                url,
                received: outbound_rx,
                events: inbound_tx,
            };
            peers.send(peer).map_err(|_| TransportError::Closed)?;

            Ok(Duplex {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        })
    }
}

/// The coordinator's end of an in-process connection
pub struct MemoryPeer {
    url: RoomUrl,
    received: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MemoryPeer {
    /// The URL the client opened
    pub fn url(&self) -> &RoomUrl {
        &self.url
    }

    /// Deliver a text frame to the client. Returns false if the client is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.events.send(TransportEvent::Text(text.into())).is_ok()
    }

    /// Close the connection from the coordinator's side
    pub fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed);
    }

    /// Next frame sent by the client; `None` once the client has hung up
    pub async fn recv(&mut self) -> Option<String> {
        self.received.recv().await
    }

    /// Next frame sent by the client, if one is already queued
    pub fn try_recv(&mut self) -> Option<String> {
        self.received.try_recv().ok()
    }
}
