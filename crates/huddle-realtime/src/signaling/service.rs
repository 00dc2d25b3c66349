//! Task that owns a [`CallOrchestrator`] and the handle used to drive it.

use std::sync::Arc;

use huddle_common::{ClientId, SignalingError};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{info, warn};

use crate::transport::{Subscription, Transport};

use super::media::{MediaDevices, MediaStream, PeerConnector, PeerSignal};
use super::orchestrator::{CallIds, CallOrchestrator, CallState, OrchestratorConfig};
use super::types::StreamConfig;

#[derive(Debug)]
enum CallCommand {
    Join {
        ids: CallIds,
        stream_config: StreamConfig,
        reply: oneshot::Sender<Result<(), SignalingError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Spawns the call task.
pub struct CallService;

impl CallService {
    /// Subscribe to the signaling channel and start driving an orchestrator.
    ///
    /// The task runs until every [`CallHandle`] is dropped, then leaves the
    /// call and releases its resources.
    pub fn spawn(
        transport: &Transport,
        client_id: ClientId,
        config: OrchestratorConfig,
        media: Arc<dyn MediaDevices>,
        connector: Arc<dyn PeerConnector>,
    ) -> CallHandle {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel::<Value>();
        let subscription = transport.subscribe(&config.signaling_channel, move |content| {
            let _ = signal_tx.send(content.clone());
        });

        let (orchestrator, peer_rx) =
            CallOrchestrator::new(transport.clone(), client_id.clone(), config, media, connector);
        let (command_tx, command_rx) = mpsc::channel(32);

        let handle = CallHandle {
            command_tx,
            client_id,
            state_rx: orchestrator.watch_state(),
            local_rx: orchestrator.watch_local_stream(),
            remote_rx: orchestrator.watch_remote_streams(),
        };

        tokio::spawn(run(orchestrator, command_rx, signal_rx, peer_rx, subscription));
        handle
    }
}

async fn run(
    mut orchestrator: CallOrchestrator,
    mut command_rx: mpsc::Receiver<CallCommand>,
    mut signal_rx: mpsc::UnboundedReceiver<Value>,
    mut peer_rx: mpsc::UnboundedReceiver<PeerSignal>,
    _subscription: Subscription,
) {
    info!(client_id = %orchestrator.client_id(), "Call service started");

    loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(CallCommand::Join { ids, stream_config, reply }) => {
                    let result = orchestrator
                        .join_channel(&ids.room_id, &ids.call_room_id, stream_config)
                        .await;
                    let _ = reply.send(result);
                }
                Some(CallCommand::Close { reply }) => {
                    orchestrator.close_channel();
                    let _ = reply.send(());
                }
                None => {
                    info!("All call handles dropped");
                    break;
                }
            },
            Some(content) = signal_rx.recv() => {
                orchestrator.handle_signal_value(&content).await;
            }
            Some(signal) = peer_rx.recv() => {
                orchestrator.handle_peer_event(signal).await;
            }
        }
    }

    orchestrator.close_channel();
    info!("Call service stopped");
}

/// Cloneable front end of a running [`CallService`].
#[derive(Debug, Clone)]
pub struct CallHandle {
    command_tx: mpsc::Sender<CallCommand>,
    client_id: ClientId,
    state_rx: watch::Receiver<CallState>,
    local_rx: watch::Receiver<Option<MediaStream>>,
    remote_rx: watch::Receiver<Vec<MediaStream>>,
}

impl CallHandle {
    /// Join a call. Empty ids fail immediately without reaching the task.
    pub async fn join_channel(
        &self,
        room_id: &str,
        call_room_id: &str,
        stream_config: StreamConfig,
    ) -> Result<(), SignalingError> {
        let ids = CallIds::new(room_id, call_room_id)?;
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(CallCommand::Join {
                ids,
                stream_config,
                reply,
            })
            .await
            .map_err(|_| SignalingError::ServiceStopped)?;
        rx.await.map_err(|_| SignalingError::ServiceStopped)?
    }

    pub async fn close_channel(&self) {
        let (reply, rx) = oneshot::channel();
        if self.command_tx.send(CallCommand::Close { reply }).await.is_err() {
            warn!("close_channel on a stopped call service");
            return;
        }
        let _ = rx.await;
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn state(&self) -> CallState {
        *self.state_rx.borrow()
    }

    pub fn local_stream(&self) -> Option<MediaStream> {
        self.local_rx.borrow().clone()
    }

    pub fn remote_streams(&self) -> Vec<MediaStream> {
        self.remote_rx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<CallState> {
        self.state_rx.clone()
    }

    pub fn watch_local_stream(&self) -> watch::Receiver<Option<MediaStream>> {
        self.local_rx.clone()
    }

    pub fn watch_remote_streams(&self) -> watch::Receiver<Vec<MediaStream>> {
        self.remote_rx.clone()
    }
}
