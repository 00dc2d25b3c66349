//! Per-section validators: connection, channels, call, chat, and relay.

use crate::schema::HuddleConfig;

use super::helpers::{validate_non_empty, validate_range};

/// Validate the hub URL and reconnect timing.
pub(crate) fn validate_connection(errors: &mut Vec<String>, config: &HuddleConfig) {
    let url = &config.connection.url;
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        errors.push(format!("connection.url = {url:?} must use ws:// or wss://"));
    }
    validate_range(
        errors,
        "connection.connect_timeout_secs",
        config.connection.connect_timeout_secs,
        1,
        120,
    );

    let reconnect = &config.connection.reconnect;
    validate_range(
        errors,
        "connection.reconnect.base_delay_secs",
        reconnect.base_delay_secs,
        1,
        300,
    );
    if reconnect.max_delay_secs < reconnect.base_delay_secs {
        errors.push(format!(
            "connection.reconnect.max_delay_secs = {} is below base_delay_secs = {}",
            reconnect.max_delay_secs, reconnect.base_delay_secs
        ));
    }
}

/// Channel names must be present and distinct.
pub(crate) fn validate_channels(errors: &mut Vec<String>, config: &HuddleConfig) {
    validate_non_empty(errors, "channels.presence", &config.channels.presence);
    validate_non_empty(errors, "channels.signaling", &config.channels.signaling);
    if config.channels.presence == config.channels.signaling {
        errors.push("channels.presence and channels.signaling must differ".into());
    }
}

/// Validate call defaults.
pub(crate) fn validate_call(errors: &mut Vec<String>, config: &HuddleConfig) {
    for (i, url) in config.call.ice_servers.iter().enumerate() {
        if !(url.starts_with("stun:") || url.starts_with("turn:") || url.starts_with("turns:")) {
            errors.push(format!("call.ice_servers[{i}] = {url:?} is not a stun/turn URL"));
        }
    }
}

/// Validate chat history bounds.
pub(crate) fn validate_chat(errors: &mut Vec<String>, config: &HuddleConfig) {
    validate_range(
        errors,
        "chat.max_messages_per_channel",
        config.chat.max_messages_per_channel,
        10,
        10_000,
    );
    validate_range(
        errors,
        "chat.fallback_poll_interval_ms",
        config.chat.fallback_poll_interval_ms,
        250,
        60_000,
    );
}

/// Validate relay listener settings.
pub(crate) fn validate_relay(errors: &mut Vec<String>, config: &HuddleConfig) {
    validate_non_empty(errors, "relay.bind", &config.relay.bind);
    validate_range(errors, "relay.port", config.relay.port, 1, 65_535);
}
