//! Where the config file lives, and seeding it on first run.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use huddle_common::ConfigError;
use tracing::{debug, info};

use super::template::default_config_toml;

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "HUDDLE_CONFIG";

/// `$HUDDLE_CONFIG` if set, else `<config dir>/huddle/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("huddle").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the documented template to `path`. An existing file is left alone.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    let io_err = |what: &str, e: std::io::Error| {
        ConfigError::ParseError(format!("{what} {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err("cannot create directory for", e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "config already present, not overwriting");
            return Ok(());
        }
        Err(e) => return Err(io_err("cannot create", e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| io_err("cannot write", e))?;

    info!(path = %path.display(), "wrote default config");
    Ok(())
}
