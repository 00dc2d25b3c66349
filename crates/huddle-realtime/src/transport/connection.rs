//! Background task owning the socket for one connection attempt.

use std::sync::Weak;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle_common::Frame;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use super::client::Shared;

/// Connect, flush, then pump frames in both directions until the socket
/// ends or the transport shuts down.
///
/// The task is the only writer to the socket. It holds the transport weakly
/// so dropping every handle ends the connection.
pub(crate) async fn run_connection(
    shared: Weak<Shared>,
    url: String,
    connect_timeout: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let handshake = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url));

    let ws_stream = tokio::select! {
        _ = &mut shutdown_rx => {
            debug!("Shutdown during handshake");
            return;
        }
        result = handshake => match result {
            Ok(Ok((ws_stream, _))) => ws_stream,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to connect to hub");
                if let Some(shared) = shared.upgrade() {
                    shared.mark_disconnected();
                }
                return;
            }
            Err(_elapsed) => {
                warn!(timeout_secs = connect_timeout.as_secs(), "Hub handshake timed out");
                if let Some(shared) = shared.upgrade() {
                    shared.mark_disconnected();
                }
                return;
            }
        }
    };

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Frame>();

    let opened = shared.upgrade().is_some_and(|s| s.mark_open(outbound_tx));
    if !opened {
        let _ = ws_write.send(WsMessage::Close(None)).await;
        return;
    }

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("Closing socket on shutdown");
                let _ = ws_write.send(WsMessage::Close(None)).await;
                return;
            }
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break };
                match frame.to_text() {
                    Ok(text) => {
                        if let Err(e) = ws_write.send(WsMessage::Text(text.into())).await {
                            warn!(error = %e, "WebSocket write failed");
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, channel = %frame.channel, "Failed to encode frame"),
                }
            }
            msg = ws_read.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => match shared.upgrade() {
                    Some(s) => s.dispatch_text(text.as_str()),
                    None => break,
                },
                Some(Ok(WsMessage::Close(_))) => {
                    info!("Hub closed connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                    break;
                }
                None => break,
            }
        }
    }

    if let Some(shared) = shared.upgrade() {
        shared.mark_disconnected();
    }
}
