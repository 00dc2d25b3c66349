//! huddle-relay: channel fan-out hub for the realtime transport.
//!
//! Clients subscribe to named channels over a WebSocket; every `message`
//! frame published on a channel is delivered to all of its subscribers,
//! the sender included.

pub mod connection;
pub mod hub;
pub mod protocol;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

pub use connection::handle_connection;
pub use hub::{ClientKey, Hub};

/// Accept connections forever, handing each one to the hub.
pub async fn serve(listener: TcpListener, hub: Hub) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let hub = hub.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, hub).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
