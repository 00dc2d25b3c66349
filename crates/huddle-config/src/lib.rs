//! Huddle configuration system.
//!
//! Provides TOML-based configuration for the realtime client and the relay
//! hub. All config sections use sensible defaults so partial configs work
//! out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use huddle_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

// Re-export core types for convenience
pub use schema::{HuddleConfig, CONFIG_SCHEMA_VERSION};

use huddle_common::ConfigError;

/// Convenience function to load config from the platform default path.
///
/// Loads `config.toml` from the OS config directory, creates a default
/// if none exists, and validates the result.
pub fn load_config() -> Result<HuddleConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &HuddleConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = HuddleConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"connection\""));
        assert!(json.contains("\"channels\""));
        assert!(json.contains("\"call\""));
        assert!(json.contains("\"chat\""));
        assert!(json.contains("\"relay\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_json() {
        let config = HuddleConfig::default();
        let json = config_to_json(&config);
        let parsed: HuddleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.channels.signaling, "call-signaling");
        assert_eq!(parsed.connection.url, "ws://localhost:8080/ws");
        assert_eq!(parsed.chat.max_messages_per_channel, 500);
    }
}
