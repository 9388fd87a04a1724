//! WebSocket connector

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, warn};

use super::room_url::RoomUrl;
use super::transport::{Connector, Duplex, TransportError, TransportEvent};

/// Connects to coordinators over WebSocket
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WebSocketConnector {
    fn open(&self, url: &RoomUrl) -> BoxFuture<'static, Result<Duplex, TransportError>> {
        let url = url.as_str().to_string();
        Box::pin(async move {
            let (ws_stream, _) = connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::Connect(e.to_string()))?;
            debug!("WebSocket open: {}", url);

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

            // Writer task: ends when the adapter drops its sender
            tokio::spawn(async move {
                while let Some(text) = outbound_rx.recv().await {
                    if let Err(e) = ws_sender.send(WsMessage::Text(text.into())).await {
                        warn!("WebSocket send failed: {}", e);
                        break;
                    }
                }
                let _ = ws_sender.close().await;
            });

            // Reader task: forwards text frames, then a final Closed
            tokio::spawn(async move {
                while let Some(msg) = ws_receiver.next().await {
                    let text = match msg {
                        Ok(WsMessage::Text(text)) => text.as_str().to_owned(),
                        Ok(WsMessage::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
                        Ok(WsMessage::Close(frame)) => {
                            debug!("WebSocket closed by peer: {:?}", frame);
                            break;
                        }
                        Ok(_) => continue,
                        Err(e) => {
                            warn!("WebSocket receive failed: {}", e);
                            break;
                        }
                    };
                    if inbound_tx.send(TransportEvent::Text(text)).is_err() {
                        // Nobody is listening any more
                        return;
                    }
                }
                let _ = inbound_tx.send(TransportEvent::Closed);
            });

            Ok(Duplex {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        })
    }
}
