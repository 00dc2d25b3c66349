//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = HuddleConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_non_websocket_url() {
    let mut config = HuddleConfig::default();
    config.connection.url = "http://localhost:8080/ws".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("connection.url"));
}

#[test]
fn catches_connect_timeout_zero() {
    let mut config = HuddleConfig::default();
    config.connection.connect_timeout_secs = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("connection.connect_timeout_secs"));
}

#[test]
fn catches_max_delay_below_base() {
    let mut config = HuddleConfig::default();
    config.connection.reconnect.base_delay_secs = 10;
    config.connection.reconnect.max_delay_secs = 5;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("max_delay_secs"));
}

#[test]
fn catches_empty_channel_name() {
    let mut config = HuddleConfig::default();
    config.channels.presence = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("channels.presence must not be empty"));
}

#[test]
fn catches_shared_channel_names() {
    let mut config = HuddleConfig::default();
    config.channels.signaling = config.channels.presence.clone();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("must differ"));
}

#[test]
fn catches_bad_ice_server() {
    let mut config = HuddleConfig::default();
    config.call.ice_servers.push("https://example.com".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("call.ice_servers[1]"));
}

#[test]
fn catches_chat_history_too_small() {
    let mut config = HuddleConfig::default();
    config.chat.max_messages_per_channel = 1;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("chat.max_messages_per_channel"));
}

#[test]
fn catches_relay_port_out_of_range() {
    let mut config = HuddleConfig::default();
    config.relay.port = 70_000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("relay.port"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = HuddleConfig::default();
    config.chat.fallback_poll_interval_ms = 10;
    config.relay.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("chat.fallback_poll_interval_ms"));
    assert!(err.contains("relay.port"));
}
