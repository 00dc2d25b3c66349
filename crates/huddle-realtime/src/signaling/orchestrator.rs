//! Mesh call negotiation for one participant.

use std::collections::HashMap;
use std::sync::Arc;

use huddle_common::{ClientId, SignalingError};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::transport::Transport;

use super::media::{
    MediaDevices, MediaStream, PeerConnectionState, PeerConnector, PeerEvent, PeerEventSink,
    PeerSignal,
};
use super::peer_link::{PeerLink, PeerLinkState};
use super::types::{IceCandidate, SignalContent, SignalKind, SignalMessage, StreamConfig};

// ---------------------------------------------------------------------------
// Configuration and state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Transport channel carrying signaling messages.
    pub signaling_channel: String,
    pub ice_servers: Vec<String>,
    /// Hold candidates for links that do not exist yet.
    pub buffer_early_candidates: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            signaling_channel: "call-signaling".to_string(),
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            buffer_early_candidates: false,
        }
    }
}

/// Lifecycle of the local participant's call. Re-joining from `Closed`
/// behaves like joining from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    Joining,
    Active,
    Closed,
}

/// `(roomId, callRoomId)` of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIds {
    pub room_id: String,
    pub call_room_id: String,
}

impl CallIds {
    /// Rejects empty ids. Runs before anything is awaited.
    pub fn new(room_id: &str, call_room_id: &str) -> Result<Self, SignalingError> {
        if room_id.is_empty() {
            return Err(SignalingError::MissingRoomId);
        }
        if call_room_id.is_empty() {
            return Err(SignalingError::MissingCallRoomId);
        }
        Ok(Self {
            room_id: room_id.to_string(),
            call_room_id: call_room_id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Negotiates one [`PeerLink`] per remote participant of the current call.
///
/// Everything runs on `&mut self`, so a single owner (normally the
/// [`CallService`](super::CallService) task) serializes all transitions.
pub struct CallOrchestrator {
    config: OrchestratorConfig,
    transport: Transport,
    client_id: ClientId,
    media: Arc<dyn MediaDevices>,
    connector: Arc<dyn PeerConnector>,

    state: CallState,
    call: Option<CallIds>,
    local_stream: Option<MediaStream>,
    links: HashMap<ClientId, PeerLink>,
    early_candidates: HashMap<ClientId, Vec<IceCandidate>>,
    /// Exposed remote streams, deduplicated by stream id.
    remote_streams: Vec<MediaStream>,
    next_link_id: u64,
    peer_tx: mpsc::UnboundedSender<PeerSignal>,

    state_tx: watch::Sender<CallState>,
    local_tx: watch::Sender<Option<MediaStream>>,
    remote_tx: watch::Sender<Vec<MediaStream>>,
}

impl CallOrchestrator {
    /// Returns the orchestrator and the receiver its peer events arrive on.
    /// The owner feeds that receiver back into [`handle_peer_event`](Self::handle_peer_event).
    pub fn new(
        transport: Transport,
        client_id: ClientId,
        config: OrchestratorConfig,
        media: Arc<dyn MediaDevices>,
        connector: Arc<dyn PeerConnector>,
    ) -> (Self, mpsc::UnboundedReceiver<PeerSignal>) {
        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(CallState::Idle);
        let (local_tx, _) = watch::channel(None);
        let (remote_tx, _) = watch::channel(Vec::new());

        let orchestrator = Self {
            config,
            transport,
            client_id,
            media,
            connector,
            state: CallState::Idle,
            call: None,
            local_stream: None,
            links: HashMap::new(),
            early_candidates: HashMap::new(),
            remote_streams: Vec::new(),
            next_link_id: 0,
            peer_tx,
            state_tx,
            local_tx,
            remote_tx,
        };
        (orchestrator, peer_rx)
    }

    // -- observables --------------------------------------------------------

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn call(&self) -> Option<&CallIds> {
        self.call.as_ref()
    }

    pub fn local_stream(&self) -> Option<&MediaStream> {
        self.local_stream.as_ref()
    }

    pub fn remote_streams(&self) -> &[MediaStream] {
        &self.remote_streams
    }

    pub fn link_state(&self, remote: &ClientId) -> Option<PeerLinkState> {
        self.links.get(remote).map(PeerLink::state)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn watch_state(&self) -> watch::Receiver<CallState> {
        self.state_tx.subscribe()
    }

    pub fn watch_local_stream(&self) -> watch::Receiver<Option<MediaStream>> {
        self.local_tx.subscribe()
    }

    pub fn watch_remote_streams(&self) -> watch::Receiver<Vec<MediaStream>> {
        self.remote_tx.subscribe()
    }

    // -- commands -----------------------------------------------------------

    /// Join `(room_id, call_room_id)`.
    ///
    /// A join for the call already in progress is a no-op. A join for a
    /// different call leaves the current one first. If local media cannot be
    /// acquired the state returns to `Idle` and the error is returned.
    pub async fn join_channel(
        &mut self,
        room_id: &str,
        call_room_id: &str,
        stream_config: StreamConfig,
    ) -> Result<(), SignalingError> {
        let ids = CallIds::new(room_id, call_room_id)?;

        if matches!(self.state, CallState::Joining | CallState::Active) {
            if self.call.as_ref() == Some(&ids) {
                debug!(room_id = %room_id, call_room_id = %call_room_id, "Already in call");
                return Ok(());
            }
            info!(call_room_id = %call_room_id, "Switching call");
            self.close_channel();
        }

        self.call = Some(ids);
        self.set_state(CallState::Joining);
        self.remote_streams.clear();
        self.publish_remote_streams();

        let stream = match self.media.acquire(stream_config).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, call_room_id = %call_room_id, "Local media unavailable");
                self.call = None;
                self.local_stream = None;
                self.local_tx.send_replace(None);
                self.set_state(CallState::Idle);
                return Err(e.into());
            }
        };

        let stream_id = stream.id.clone();
        self.local_stream = Some(stream.clone());
        self.local_tx.send_replace(Some(stream));
        self.set_state(CallState::Active);

        let mut content = SignalContent::from_client(&self.client_id);
        content.stream_id = Some(stream_id);
        self.send_signal(SignalKind::InitializeCall, content);
        info!(room_id = %room_id, call_room_id = %call_room_id, "Joined call");
        Ok(())
    }

    /// Leave the current call. Does nothing when idle or already closed.
    pub fn close_channel(&mut self) {
        if !matches!(self.state, CallState::Joining | CallState::Active) {
            return;
        }
        for (_, mut link) in self.links.drain() {
            link.close();
        }
        self.early_candidates.clear();
        if let Some(stream) = self.local_stream.take() {
            self.media.release(&stream);
        }
        self.local_tx.send_replace(None);
        self.remote_streams.clear();
        self.publish_remote_streams();

        self.send_signal(SignalKind::Leave, SignalContent::from_client(&self.client_id));
        if let Some(call) = self.call.take() {
            info!(call_room_id = %call.call_room_id, "Left call");
        }
        self.set_state(CallState::Closed);
    }

    // -- inbound signaling --------------------------------------------------

    /// Decode and handle the content of a signaling-channel frame.
    pub async fn handle_signal_value(&mut self, content: &Value) {
        match serde_json::from_value::<SignalMessage>(content.clone()) {
            Ok(message) => self.handle_signal(message).await,
            Err(e) => warn!(error = %e, "Ignoring malformed signaling message"),
        }
    }

    pub async fn handle_signal(&mut self, message: SignalMessage) {
        let Some(from) = self.accepts(&message) else {
            return;
        };
        match message.kind {
            SignalKind::InitializeCall => self.on_remote_join(from).await,
            SignalKind::Offer => self.on_offer(from, &message.content).await,
            SignalKind::Answer => self.on_answer(from, &message.content).await,
            SignalKind::Candidate => self.on_candidate(from, &message.content).await,
            SignalKind::Leave => {
                if self.close_link(&from) {
                    info!(remote = %from, "Participant left call");
                }
            }
        }
    }

    /// The sender of a message meant for us, or `None` to ignore it.
    fn accepts(&self, message: &SignalMessage) -> Option<ClientId> {
        let call = self.call.as_ref()?;
        if self.state != CallState::Active {
            debug!(kind = ?message.kind, state = ?self.state, "Signal ignored, call not active");
            return None;
        }
        if message.channel != call.call_room_id || message.server_id != call.room_id {
            return None;
        }
        let from = message.content.client_id.clone()?;
        if from == self.client_id {
            return None;
        }
        match &message.content.target {
            Some(target) if target != &self.client_id => None,
            _ => Some(from),
        }
    }

    async fn on_remote_join(&mut self, from: ClientId) {
        // A rejoin replaces whatever we had with that client.
        self.close_link(&from);
        if let Err(e) = self.open_link(&from).await {
            warn!(remote = %from, error = %e, "Failed to create peer link");
            return;
        }

        let result = match self.links.get_mut(&from) {
            Some(link) => link.start_offer(self.local_stream.as_ref()).await,
            None => return,
        };
        match result {
            Ok(offer) => {
                let mut content = SignalContent::from_client(&self.client_id).to(&from);
                content.data = encode(&offer);
                self.send_signal(SignalKind::Offer, content);
                debug!(remote = %from, "Sent offer");
            }
            Err(e) => {
                warn!(remote = %from, error = %e, "Failed to create offer");
                self.close_link(&from);
            }
        }
    }

    async fn on_offer(&mut self, from: ClientId, content: &SignalContent) {
        let Some(offer) = content.offer() else {
            warn!(remote = %from, "Failed to parse offer");
            return;
        };

        let glare = self.links.get(&from).is_some_and(PeerLink::awaiting_answer);
        if glare && self.client_id.as_str() < from.as_str() {
            // Offers crossed. The lower client id keeps its own offer and
            // the other side answers it.
            debug!(remote = %from, "Crossing offer ignored, waiting for answer");
            return;
        }

        let reusable = self
            .links
            .get(&from)
            .is_some_and(|link| link.state() == PeerLinkState::New);
        if !reusable {
            self.close_link(&from);
            if let Err(e) = self.open_link(&from).await {
                warn!(remote = %from, error = %e, "Failed to create peer link");
                return;
            }
        }

        let result = match self.links.get_mut(&from) {
            Some(link) => link.accept_offer(offer, self.local_stream.as_ref()).await,
            None => return,
        };
        match result {
            Ok(answer) => {
                let mut content = SignalContent::from_client(&self.client_id).to(&from);
                content.answer = serde_json::to_value(&answer).ok();
                self.send_signal(SignalKind::Answer, content);
                debug!(remote = %from, "Sent answer");
            }
            Err(e) => {
                warn!(remote = %from, error = %e, "Failed to answer offer");
                self.close_link(&from);
            }
        }
    }

    async fn on_answer(&mut self, from: ClientId, content: &SignalContent) {
        let Some(answer) = content.answer_description() else {
            warn!(remote = %from, "Failed to parse answer");
            return;
        };
        let Some(link) = self.links.get_mut(&from) else {
            debug!(remote = %from, "Answer for unknown link dropped");
            return;
        };
        if let Err(e) = link.accept_answer(answer).await {
            warn!(remote = %from, error = %e, "Failed to apply answer");
            self.close_link(&from);
        }
    }

    async fn on_candidate(&mut self, from: ClientId, content: &SignalContent) {
        let Some(candidate) = content.ice_candidate() else {
            warn!(remote = %from, "Failed to parse candidate");
            return;
        };
        match self.links.get_mut(&from) {
            Some(link) => {
                if let Err(e) = link.add_remote_candidate(candidate).await {
                    warn!(remote = %from, error = %e, "Failed to add candidate");
                }
            }
            None if self.config.buffer_early_candidates => {
                self.early_candidates.entry(from).or_default().push(candidate);
            }
            None => debug!(remote = %from, "Candidate for unknown link dropped"),
        }
    }

    // -- peer events --------------------------------------------------------

    pub async fn handle_peer_event(&mut self, signal: PeerSignal) {
        let Some(link) = self.links.get_mut(&signal.remote) else {
            return;
        };
        if link.id() != signal.link_id {
            debug!(remote = %signal.remote, "Event from a replaced link ignored");
            return;
        }

        match signal.event {
            PeerEvent::IceCandidate(candidate) => {
                let mut content = SignalContent::from_client(&self.client_id).to(&signal.remote);
                content.data = encode(&candidate);
                self.send_signal(SignalKind::Candidate, content);
            }
            PeerEvent::Track(stream) => {
                if self.remote_streams.iter().any(|s| s.id == stream.id) {
                    return;
                }
                link.add_remote_stream(&stream.id);
                debug!(remote = %signal.remote, stream_id = %stream.id, "Remote stream added");
                self.remote_streams.push(stream);
                self.publish_remote_streams();
            }
            PeerEvent::TrackRemoved { stream_id } => {
                if link.remove_remote_stream(&stream_id) {
                    self.remote_streams.retain(|s| s.id != stream_id);
                    self.publish_remote_streams();
                }
            }
            PeerEvent::StateChanged(PeerConnectionState::Connected) => link.mark_connected(),
            PeerEvent::StateChanged(PeerConnectionState::Failed | PeerConnectionState::Closed) => {
                info!(remote = %signal.remote, "Peer connection ended");
                self.close_link(&signal.remote);
            }
            PeerEvent::StateChanged(state) => {
                debug!(remote = %signal.remote, ?state, "Peer connection state");
            }
        }
    }

    // -- helpers ------------------------------------------------------------

    async fn open_link(&mut self, remote: &ClientId) -> Result<(), SignalingError> {
        self.next_link_id += 1;
        let link_id = self.next_link_id;
        let sink = PeerEventSink::new(link_id, remote.clone(), self.peer_tx.clone());
        let connection = self
            .connector
            .create(remote, &self.config.ice_servers, sink)
            .await?;

        let mut link = PeerLink::new(link_id, remote.clone(), connection);
        for candidate in self.early_candidates.remove(remote).unwrap_or_default() {
            link.add_remote_candidate(candidate).await?;
        }
        self.links.insert(remote.clone(), link);
        Ok(())
    }

    /// Close and forget the link to `remote`. False if there was none.
    fn close_link(&mut self, remote: &ClientId) -> bool {
        let Some(mut link) = self.links.remove(remote) else {
            return false;
        };
        let dropped = link.close();
        if !dropped.is_empty() {
            self.remote_streams.retain(|s| !dropped.contains(&s.id));
            self.publish_remote_streams();
        }
        true
    }

    fn send_signal(&self, kind: SignalKind, content: SignalContent) -> bool {
        let Some(call) = &self.call else {
            return false;
        };
        let message = SignalMessage {
            kind,
            channel: call.call_room_id.clone(),
            server_id: call.room_id.clone(),
            content,
        };
        match serde_json::to_value(&message) {
            Ok(value) => self.transport.publish(&self.config.signaling_channel, value),
            Err(e) => {
                warn!(error = %e, "Failed to encode signaling message");
                false
            }
        }
    }

    fn set_state(&mut self, state: CallState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }

    fn publish_remote_streams(&self) {
        self.remote_tx.send_replace(self.remote_streams.clone());
    }
}

impl Drop for CallOrchestrator {
    fn drop(&mut self) {
        if let Some(stream) = self.local_stream.take() {
            self.media.release(&stream);
        }
        // PeerLink closes itself on drop.
        self.links.clear();
    }
}

/// Description or candidate as a JSON string for `content.data`.
fn encode<T: serde::Serialize>(value: &T) -> Option<Value> {
    serde_json::to_string(value).ok().map(Value::String)
}
