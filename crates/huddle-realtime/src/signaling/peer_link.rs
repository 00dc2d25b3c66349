//! Negotiation state for one remote participant.

use huddle_common::{ClientId, SignalingError};
use tracing::{debug, warn};

use super::media::{MediaStream, PeerConnection};
use super::types::{IceCandidate, SdpType, SessionDescription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerLinkState {
    New,
    /// Descriptions are being exchanged or have been exchanged, and the
    /// backend has not yet reported the connection as up.
    Negotiating,
    /// The backend reported the connection as established.
    Connected,
    Closed,
}

/// One peer connection plus the bookkeeping around it.
///
/// Remote candidates that arrive before the remote description are held
/// and applied, in order, right after it is set.
pub struct PeerLink {
    id: u64,
    remote: ClientId,
    connection: Box<dyn PeerConnection>,
    state: PeerLinkState,
    remote_description_set: bool,
    local_stream_attached: bool,
    pending_candidates: Vec<IceCandidate>,
    /// Ids of remote streams received over this link.
    remote_streams: Vec<String>,
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("id", &self.id)
            .field("remote", &self.remote)
            .field("state", &self.state)
            .field("pending_candidates", &self.pending_candidates.len())
            .field("remote_streams", &self.remote_streams)
            .finish()
    }
}

impl PeerLink {
    pub(crate) fn new(id: u64, remote: ClientId, connection: Box<dyn PeerConnection>) -> Self {
        Self {
            id,
            remote,
            connection,
            state: PeerLinkState::New,
            remote_description_set: false,
            local_stream_attached: false,
            pending_candidates: Vec::new(),
            remote_streams: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn remote(&self) -> &ClientId {
        &self.remote
    }

    pub fn state(&self) -> PeerLinkState {
        self.state
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn remote_streams(&self) -> &[String] {
        &self.remote_streams
    }

    /// Answer a remote offer. Returns the answer to send back.
    pub(crate) async fn accept_offer(
        &mut self,
        offer: SessionDescription,
        local: Option<&MediaStream>,
    ) -> Result<SessionDescription, SignalingError> {
        self.ensure_open()?;
        if offer.kind != SdpType::Offer {
            return Err(SignalingError::Peer(format!("expected offer, got {:?}", offer.kind)));
        }
        self.state = PeerLinkState::Negotiating;
        self.connection.set_remote_description(offer).await?;
        self.remote_description_set = true;
        self.flush_candidates().await;

        self.attach_local(local).await?;
        let answer = self.connection.create_answer().await?;
        self.connection.set_local_description(answer.clone()).await?;
        Ok(answer)
    }

    /// Start negotiation from this side. Returns the offer to send.
    pub(crate) async fn start_offer(
        &mut self,
        local: Option<&MediaStream>,
    ) -> Result<SessionDescription, SignalingError> {
        self.ensure_open()?;
        self.attach_local(local).await?;
        let offer = self.connection.create_offer().await?;
        self.connection.set_local_description(offer.clone()).await?;
        self.state = PeerLinkState::Negotiating;
        Ok(offer)
    }

    /// Apply the answer to our offer. Returns false if none was expected.
    pub(crate) async fn accept_answer(&mut self, answer: SessionDescription) -> Result<bool, SignalingError> {
        if self.state != PeerLinkState::Negotiating || self.remote_description_set {
            debug!(remote = %self.remote, state = ?self.state, "Unexpected answer ignored");
            return Ok(false);
        }
        self.connection.set_remote_description(answer).await?;
        self.remote_description_set = true;
        self.flush_candidates().await;
        Ok(true)
    }

    /// True while our offer is out and no answer has been applied.
    pub fn awaiting_answer(&self) -> bool {
        self.state == PeerLinkState::Negotiating && !self.remote_description_set
    }

    pub(crate) async fn add_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), SignalingError> {
        self.ensure_open()?;
        if !self.remote_description_set {
            self.pending_candidates.push(candidate);
            return Ok(());
        }
        self.connection.add_ice_candidate(candidate).await
    }

    /// Record a remote stream. False if it was already known.
    pub(crate) fn add_remote_stream(&mut self, stream_id: &str) -> bool {
        if self.remote_streams.iter().any(|s| s == stream_id) {
            return false;
        }
        self.remote_streams.push(stream_id.to_string());
        true
    }

    pub(crate) fn remove_remote_stream(&mut self, stream_id: &str) -> bool {
        let before = self.remote_streams.len();
        self.remote_streams.retain(|s| s != stream_id);
        self.remote_streams.len() != before
    }

    pub(crate) fn mark_connected(&mut self) {
        if self.state != PeerLinkState::Closed {
            self.state = PeerLinkState::Connected;
        }
    }

    /// Close the connection once. Returns the remote stream ids it owned.
    pub(crate) fn close(&mut self) -> Vec<String> {
        if self.state == PeerLinkState::Closed {
            return Vec::new();
        }
        self.state = PeerLinkState::Closed;
        self.pending_candidates.clear();
        self.connection.close();
        debug!(remote = %self.remote, link_id = self.id, "Peer link closed");
        std::mem::take(&mut self.remote_streams)
    }

    async fn attach_local(&mut self, local: Option<&MediaStream>) -> Result<(), SignalingError> {
        if self.local_stream_attached {
            return Ok(());
        }
        if let Some(stream) = local {
            self.connection.add_stream(stream).await?;
            self.local_stream_attached = true;
        }
        Ok(())
    }

    async fn flush_candidates(&mut self) {
        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = self.connection.add_ice_candidate(candidate).await {
                warn!(remote = %self.remote, error = %e, "Failed to apply buffered candidate");
            }
        }
    }

    fn ensure_open(&self) -> Result<(), SignalingError> {
        if self.state == PeerLinkState::Closed {
            return Err(SignalingError::Peer(format!("link to {} is closed", self.remote)));
        }
        Ok(())
    }
}

impl Drop for PeerLink {
    fn drop(&mut self) {
        self.close();
    }
}
