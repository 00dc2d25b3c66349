//! Full configuration validation.
//!
//! Validates numeric ranges, URL schemes, and channel naming, collecting
//! every problem into a single `ConfigError`.

mod helpers;
mod sections;

#[cfg(test)]
mod tests;

use crate::schema::HuddleConfig;
use huddle_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &HuddleConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_connection(&mut errors, config);
    sections::validate_channels(&mut errors, config);
    sections::validate_call(&mut errors, config);
    sections::validate_chat(&mut errors, config);
    sections::validate_relay(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
