//! Local capture and peer connection seams.
//!
//! The orchestrator never talks to a WebRTC stack directly. A backend
//! implements these traits and reports asynchronous events through the
//! [`PeerEventSink`] it is handed.

use async_trait::async_trait;
use huddle_common::{ClientId, MediaError, SignalingError};
use tokio::sync::mpsc;

use super::types::{IceCandidate, SessionDescription, StreamConfig};

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
}

/// A bundle of tracks identified by stream id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn has_kind(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }
}

/// Capture devices of the local machine.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self, config: StreamConfig) -> Result<MediaStream, MediaError>;

    /// Stop every track of `stream`.
    fn release(&self, stream: &MediaStream);
}

// ---------------------------------------------------------------------------
// Peer connections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Asynchronous notifications from a peer connection.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A local candidate to trickle to the remote side.
    IceCandidate(IceCandidate),
    Track(MediaStream),
    TrackRemoved { stream_id: String },
    StateChanged(PeerConnectionState),
}

/// A [`PeerEvent`] tagged with the link it came from.
#[derive(Debug, Clone)]
pub struct PeerSignal {
    pub(crate) link_id: u64,
    pub remote: ClientId,
    pub event: PeerEvent,
}

/// Where a backend reports events for one peer connection.
#[derive(Debug, Clone)]
pub struct PeerEventSink {
    link_id: u64,
    remote: ClientId,
    tx: mpsc::UnboundedSender<PeerSignal>,
}

impl PeerEventSink {
    pub(crate) fn new(link_id: u64, remote: ClientId, tx: mpsc::UnboundedSender<PeerSignal>) -> Self {
        Self { link_id, remote, tx }
    }

    pub fn remote(&self) -> &ClientId {
        &self.remote
    }

    /// Returns false once the orchestrator is gone.
    pub fn emit(&self, event: PeerEvent) -> bool {
        self.tx
            .send(PeerSignal {
                link_id: self.link_id,
                remote: self.remote.clone(),
                event,
            })
            .is_ok()
    }
}

/// Creates one peer connection per remote participant.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn create(
        &self,
        remote: &ClientId,
        ice_servers: &[String],
        events: PeerEventSink,
    ) -> Result<Box<dyn PeerConnection>, SignalingError>;
}

/// One negotiated connection to a remote participant.
#[async_trait]
pub trait PeerConnection: Send {
    async fn add_stream(&mut self, stream: &MediaStream) -> Result<(), SignalingError>;

    async fn set_remote_description(&mut self, desc: SessionDescription) -> Result<(), SignalingError>;

    async fn set_local_description(&mut self, desc: SessionDescription) -> Result<(), SignalingError>;

    async fn create_offer(&mut self) -> Result<SessionDescription, SignalingError>;

    async fn create_answer(&mut self) -> Result<SessionDescription, SignalingError>;

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), SignalingError>;

    fn close(&mut self);
}
