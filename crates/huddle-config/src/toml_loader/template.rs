//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Huddle Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[connection]
url = "ws://localhost:8080/ws"
# connect_timeout_secs = 15   # 1-120

[connection.reconnect]
# enabled = false
# base_delay_secs = 1         # 1-300
# max_delay_secs = 30         # >= base_delay_secs

[channels]
# presence = "presence"
# signaling = "call-signaling"

[call]
# ice_servers = ["stun:stun.l.google.com:19302"]
# audio = true
# video = true
# buffer_early_candidates = false

[chat]
# max_messages_per_channel = 500     # 10-10000
# fallback_poll_interval_ms = 1000   # 250-60000

[relay]
# bind = "0.0.0.0"
# port = 8080                 # 1-65535

[logging]
# level = "INFO"              # TRACE, DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
