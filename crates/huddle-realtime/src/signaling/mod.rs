//! Mesh call signaling: one peer link per remote participant, negotiated
//! with offer/answer/candidate messages over the transport.

mod media;
mod orchestrator;
mod peer_link;
mod service;
mod types;


pub use media::{
    MediaDevices, MediaStream, MediaTrack, PeerConnection, PeerConnectionState, PeerConnector,
    PeerEvent, PeerEventSink, PeerSignal, TrackKind,
};
pub use orchestrator::{CallIds, CallOrchestrator, CallState, OrchestratorConfig};
pub use peer_link::{PeerLink, PeerLinkState};
pub use service::{CallHandle, CallService};
pub use types::{
    IceCandidate, SdpType, SessionDescription, SignalContent, SignalKind, SignalMessage,
    StreamConfig,
};
