//! Configuration, state, and handler types for the transport.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where and how to reach the hub.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// `ws://` or `wss://` endpoint of the hub.
    pub url: String,
    /// Upper bound on the WebSocket handshake.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            connect_timeout: Duration::from_secs(15),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Lifecycle of the physical connection. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// How consumers should obtain fresh data for the current connection state.
///
/// While the socket is down, pushed updates stop arriving and readers fall
/// back to periodic re-fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Live,
    Polling(Duration),
}

impl DeliveryMode {
    pub fn from_state(state: ConnectionState, poll_interval: Duration) -> Self {
        match state {
            ConnectionState::Open => DeliveryMode::Live,
            _ => DeliveryMode::Polling(poll_interval),
        }
    }

    /// `None` while live, otherwise the re-fetch period.
    pub fn refetch_interval(&self) -> Option<Duration> {
        match self {
            DeliveryMode::Live => None,
            DeliveryMode::Polling(interval) => Some(*interval),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Callback invoked with the `content` of every `message` frame on a channel.
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies one handler registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(pub(crate) u64);
