//! Call and chat configuration types.

use serde::{Deserialize, Serialize};

/// Audio/video call defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// STUN/TURN URLs handed to every peer connection.
    pub ice_servers: Vec<String>,
    pub audio: bool,
    pub video: bool,
    /// Hold ICE candidates that arrive before their peer link exists.
    pub buffer_early_candidates: bool,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".into()],
            audio: true,
            video: true,
            buffer_early_candidates: false,
        }
    }
}

/// Chat history and fallback polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum messages to retain per channel (valid range: 10-10000).
    pub max_messages_per_channel: u32,
    /// Re-fetch interval while the realtime connection is down (valid range: 250-60000).
    pub fallback_poll_interval_ms: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_messages_per_channel: 500,
            fallback_poll_interval_ms: 1000,
        }
    }
}
