//! Per-connection handler: register with the hub, then pump frames.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::hub::{ClientKey, Hub};
use crate::protocol::{classify, HubAction};

/// Outbound queue depth per client. A client that falls this far behind is dropped.
pub const CLIENT_QUEUE_DEPTH: usize = 256;

/// Handle a single WebSocket connection until it closes.
pub async fn handle_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, hub: Hub) {
    let (mut sink, mut stream) = ws.split();

    let (tx, mut rx) = mpsc::channel::<String>(CLIENT_QUEUE_DEPTH);
    let client = hub.register(tx).await;
    tracing::info!(peer = %addr, client, "Client registered");

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(msg) => {
                    if sink.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
                // Hub dropped our sender: the client stalled.
                None => break,
            },

            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => handle_text(&hub, client, &text).await,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::info!(peer = %addr, client, "Client disconnected");
    hub.unregister(client).await;
}

async fn handle_text(hub: &Hub, client: ClientKey, text: &str) {
    match classify(text) {
        Ok(HubAction::Subscribe(channel)) => {
            hub.subscribe(client, &channel).await;
        }
        Ok(HubAction::Unsubscribe(channel)) => {
            hub.unsubscribe(client, &channel).await;
        }
        Ok(HubAction::Broadcast { channel, text }) => {
            let delivered = hub.broadcast(&channel, &text).await;
            tracing::trace!(client, channel = %channel, delivered, "Broadcast");
        }
        Err(e) => {
            tracing::warn!(client, error = %e, "Ignoring unrecognized frame");
        }
    }
}
