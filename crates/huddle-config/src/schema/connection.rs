//! Connection and channel naming configuration.

use serde::{Deserialize, Serialize};

/// How the client reaches the realtime hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// WebSocket URL of the hub (`ws://` or `wss://`).
    pub url: String,
    /// Seconds to wait for the WebSocket handshake (valid range: 1-120).
    pub connect_timeout_secs: u32,
    pub reconnect: ReconnectConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".into(),
            connect_timeout_secs: 15,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Optional automatic reconnect with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub enabled: bool,
    pub base_delay_secs: u32,
    pub max_delay_secs: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_delay_secs: 1,
            max_delay_secs: 30,
        }
    }
}

/// Logical channel names agreed with the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub presence: String,
    pub signaling: String,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            presence: "presence".into(),
            signaling: "call-signaling".into(),
        }
    }
}

/// Settings for the `huddle-relay` hub binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind: String,
    pub port: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}
