//! Signaling wire types carried on the signaling channel.

use huddle_common::ClientId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
    InitializeCall,
    Leave,
}

/// One signaling message. `channel` is the call room, `server_id` the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    #[serde(default)]
    pub channel: String,
    #[serde(rename = "serverId", default)]
    pub server_id: String,
    #[serde(default)]
    pub content: SignalContent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalContent {
    /// JSON-encoded description (offers) or candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(rename = "streamId", default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    /// Sender.
    #[serde(rename = "clientId", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    /// Addressed client; absent means everyone in the call room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ClientId>,
}

impl SignalContent {
    pub fn from_client(client_id: &ClientId) -> Self {
        Self {
            client_id: Some(client_id.clone()),
            ..Self::default()
        }
    }

    pub fn to(mut self, target: &ClientId) -> Self {
        self.target = Some(target.clone());
        self
    }

    /// The offer carried in `data`.
    pub fn offer(&self) -> Option<SessionDescription> {
        self.data.as_ref().and_then(lenient)
    }

    /// The answer from `answer`, falling back to `data`.
    pub fn answer_description(&self) -> Option<SessionDescription> {
        self.answer
            .as_ref()
            .or(self.data.as_ref())
            .and_then(lenient)
    }

    /// The candidate from `candidate`, falling back to `data`.
    pub fn ice_candidate(&self) -> Option<IceCandidate> {
        self.candidate
            .as_ref()
            .or(self.data.as_ref())
            .and_then(lenient)
    }
}

/// Accept either an embedded object or a string holding JSON.
fn lenient<T: DeserializeOwned>(value: &Value) -> Option<T> {
    match value {
        Value::String(encoded) => serde_json::from_str(encoded).ok(),
        other => serde_json::from_value(other.clone()).ok(),
    }
}

// ---------------------------------------------------------------------------
// Negotiation payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_m_line_index: Option<u16>,
}

/// Which local devices a call captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub audio: bool,
    pub video: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}
