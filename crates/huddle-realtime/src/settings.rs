//! Runtime settings derived from the on-disk [`HuddleConfig`].

use std::time::Duration;

use huddle_config::HuddleConfig;

use crate::chat::{ChatFeedConfig, ChatHistoryConfig};
use crate::signaling::{OrchestratorConfig, StreamConfig};
use crate::transport::{ReconnectPolicy, TransportConfig};

impl From<&HuddleConfig> for TransportConfig {
    fn from(config: &HuddleConfig) -> Self {
        Self {
            url: config.connection.url.clone(),
            connect_timeout: Duration::from_secs(u64::from(config.connection.connect_timeout_secs)),
        }
    }
}

impl From<&HuddleConfig> for ReconnectPolicy {
    fn from(config: &HuddleConfig) -> Self {
        let reconnect = &config.connection.reconnect;
        Self {
            base_delay: Duration::from_secs(u64::from(reconnect.base_delay_secs)),
            max_delay: Duration::from_secs(u64::from(reconnect.max_delay_secs)),
        }
    }
}

impl From<&HuddleConfig> for OrchestratorConfig {
    fn from(config: &HuddleConfig) -> Self {
        Self {
            signaling_channel: config.channels.signaling.clone(),
            ice_servers: config.call.ice_servers.clone(),
            buffer_early_candidates: config.call.buffer_early_candidates,
        }
    }
}

impl From<&HuddleConfig> for StreamConfig {
    fn from(config: &HuddleConfig) -> Self {
        Self {
            audio: config.call.audio,
            video: config.call.video,
        }
    }
}

impl From<&HuddleConfig> for ChatFeedConfig {
    fn from(config: &HuddleConfig) -> Self {
        Self {
            history: ChatHistoryConfig {
                max_messages_per_channel: config.chat.max_messages_per_channel as usize,
            },
            fallback_poll_interval: Duration::from_millis(u64::from(
                config.chat.fallback_poll_interval_ms,
            )),
        }
    }
}

/// Whether the reconnect supervisor should be started.
pub fn reconnect_enabled(config: &HuddleConfig) -> bool {
    config.connection.reconnect.enabled
}
