//! The JSON envelope carried by every WebSocket text frame.
//!
//! Both directions share one shape:
//! `{ "type": "subscribe" | "unsubscribe" | "message", "channel": "...", "content"?: ... }`.

use serde::{Deserialize, Serialize};

/// Frame discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Subscribe,
    Unsubscribe,
    Message,
}

/// A single multiplexed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

impl Frame {
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Subscribe,
            channel: channel.into(),
            content: None,
        }
    }

    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Unsubscribe,
            channel: channel.into(),
            content: None,
        }
    }

    pub fn message(channel: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            kind: FrameKind::Message,
            channel: channel.into(),
            content: Some(content),
        }
    }

    /// Encode as a JSON text payload.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text payload. Frames without a `channel` are rejected.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
